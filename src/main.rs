// src/main.rs

use std::error::Error;
use std::process::ExitCode;

use lms_client::{
    ClientState,
    api::AssessmentApi,
    assessment::{AssessmentError, AssessmentRunner, RunnerStatus, SubmitTrigger},
    config::Config,
    models::{
        assessment::AssessmentKind,
        question::QuestionKind,
        submission::grade_for_student,
        user::Credentials,
    },
    session::{Capability, RouteDecision},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: lms-client <command>

commands:
  status                      show the current session
  login <email> <password>    authenticate and persist the session
  logout                      end the session
  check <capability>          evaluate the route guard (e.g. view-course)
  take <quiz|exam> <id>       take an assessment in the terminal
  result <quiz|exam> <id>     show your grade for an assessment
  notifications               watch the unread notification count";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (.env supported)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "lms-client.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    let state = match ClientState::init(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&state, &args).await;
    state.dispose().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &ClientState, args: &[String]) -> Result<(), Box<dyn Error>> {
    let arg = |i: usize| args.get(i).map(String::as_str).ok_or(USAGE);

    match arg(0)? {
        "status" => status(state).await,
        "login" => login(state, arg(1)?, arg(2)?).await,
        "logout" => {
            state.session.end_session().await?;
            println!("Logged out.");
            Ok(())
        }
        "check" => {
            let capability: Capability = arg(1)?.parse()?;
            match state.session.authorize_route(capability).await? {
                RouteDecision::Allow => println!("allow"),
                RouteDecision::Redirect(target) => println!("redirect {}", target.path()),
            }
            Ok(())
        }
        "take" => take(state, arg(1)?.parse()?, arg(2)?).await,
        "result" => result(state, arg(1)?.parse()?, arg(2)?).await,
        "notifications" => notifications(state).await,
        _ => Err(USAGE.into()),
    }
}

async fn status(state: &ClientState) -> Result<(), Box<dyn Error>> {
    let session = state.session.snapshot().await;
    if !session.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    if session.is_pending_approval() {
        // Same as the "Refresh Status" action on the pending page.
        state.session.refresh_approval().await?;
    }
    let session = state.session.snapshot().await;

    println!(
        "{} ({}) as {}",
        session.user_name.as_deref().unwrap_or("-"),
        session.user_id.as_deref().unwrap_or("-"),
        session.role.map(|r| r.as_str()).unwrap_or("-"),
    );
    if session.is_pending_approval() {
        println!("Account pending approval by an administrator.");
    }
    for child in &session.children {
        println!("  child: {} ({})", child.name, child.id);
    }
    Ok(())
}

async fn login(state: &ClientState, email: &str, password: &str) -> Result<(), Box<dyn Error>> {
    let session = state
        .session
        .authenticate(&Credentials::new(email, password))
        .await?;

    println!(
        "Logged in as {} ({}).",
        session.user_name.as_deref().unwrap_or("-"),
        session.role.map(|r| r.as_str()).unwrap_or("-"),
    );
    if session.is_pending_approval() {
        println!("Account pending approval by an administrator.");
    }
    Ok(())
}

async fn take(state: &ClientState, kind: AssessmentKind, id: &str) -> Result<(), Box<dyn Error>> {
    if let RouteDecision::Redirect(target) =
        state.session.authorize_route(Capability::TakeAssessment).await?
    {
        println!("Not allowed here, redirecting to {}", target.path());
        return Ok(());
    }

    let runner = state.open_assessment(kind, id).await?;
    let attempt = runner.attempt().await;

    println!("{}", attempt.title);
    if let Some(description) = &attempt.description {
        println!("{}", description);
    }
    for (i, question) in attempt.questions.iter().enumerate() {
        println!("\n{}. {} [{} pt]", i + 1, question.text, question.points());
        if let QuestionKind::MultipleChoice { options, .. } = &question.kind {
            for (j, option) in options.iter().enumerate() {
                println!("   {}) {}", j + 1, option);
            }
        }
    }
    println!("\nAnswer with '<question> <response>', 'time' to see the clock, 'submit' to finish.");

    // Subscribe first so an immediate deadline submission is observed.
    let status = runner.status();
    if runner.start_countdown() {
        if let Some(secs) = *runner.remaining().borrow() {
            println!("Time left: {}", format_time(secs));
        }
    }

    let outcome = answer_loop(&runner, status).await;
    runner.teardown();
    outcome
}

async fn answer_loop(
    runner: &AssessmentRunner,
    mut status: watch::Receiver<RunnerStatus>,
) -> Result<(), Box<dyn Error>> {
    let attempt = runner.attempt().await;
    if status.borrow_and_update().is_submitted() {
        println!("Time is up. Your answers were submitted.");
        return Ok(());
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = *status.borrow_and_update();
                match current {
                    RunnerStatus::Submitted(SubmitTrigger::Deadline) => {
                        println!("Time is up. Your answers were submitted.");
                        return Ok(());
                    }
                    RunnerStatus::SubmitFailed(SubmitTrigger::Deadline) => {
                        println!("Time is up but submission failed. Type 'submit' to retry.");
                    }
                    _ => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                let line = line.trim();

                match line {
                    "" => {}
                    "time" => match *runner.remaining().borrow() {
                        Some(secs) => println!("Time left: {}", format_time(secs)),
                        None => println!("No time limit."),
                    },
                    "submit" => match runner.submit(SubmitTrigger::User).await {
                        Ok(done) => {
                            println!("Submitted {} answers.", done.answers_submitted);
                            return Ok(());
                        }
                        Err(AssessmentError::AlreadySubmitted) => {
                            if status.borrow().is_submitted() {
                                println!("Your answers were already submitted.");
                                return Ok(());
                            }
                        }
                        Err(e) => println!("{}", e),
                    },
                    _ => {
                        let Some((number, response)) = line.split_once(' ') else {
                            println!("Expected '<question> <response>'.");
                            continue;
                        };
                        let Some(question) = number
                            .parse::<usize>()
                            .ok()
                            .and_then(|n| n.checked_sub(1))
                            .and_then(|i| attempt.questions.get(i))
                        else {
                            println!("No question {}.", number);
                            continue;
                        };

                        // Option numbers are accepted for multiple-choice questions.
                        let response = match &question.kind {
                            QuestionKind::MultipleChoice { options, .. } => response
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|n| n.checked_sub(1))
                                .and_then(|i| options.get(i).cloned())
                                .unwrap_or_else(|| response.trim().to_string()),
                            QuestionKind::OpenEnded => response.trim().to_string(),
                        };

                        if let Err(e) = runner.record_answer(question.id.clone(), response).await {
                            println!("{}", e);
                        }
                    }
                }
            }
        }
    }
}

async fn result(state: &ClientState, kind: AssessmentKind, id: &str) -> Result<(), Box<dyn Error>> {
    let session = state.session.snapshot().await;
    let (Some(token), Some(user_id)) = (state.session.bearer_token().await, session.user_id) else {
        return Err("Not logged in".into());
    };

    let definition = state.api.fetch_assessment(&token, kind, id).await?;
    let Some(grade) = grade_for_student(&definition, &user_id) else {
        println!("You have not taken this {} yet.", kind);
        return Ok(());
    };

    println!("{} - Results", definition.title);
    match (grade.score, grade.percentage()) {
        (Some(score), Some(pct)) => {
            println!("Your Score: {} / {} Points ({:.2}%)", score, grade.total_points, pct)
        }
        _ => println!("Not graded yet ({} points available).", grade.total_points),
    }
    if let Some(feedback) = &grade.feedback {
        println!("Overall Feedback: {}", feedback);
    }
    for line in &grade.per_question {
        println!("\n{} [{} pts]", line.question_text, line.points);
        println!("  Your Answer: {}", line.response.as_deref().unwrap_or("No answer provided"));
        if let Some(correct) = &line.correct_answer {
            println!("  Correct Answer: {}", correct);
        }
        if let Some(feedback) = &line.feedback {
            println!("  Feedback: {}", feedback);
        }
    }
    Ok(())
}

async fn notifications(state: &ClientState) -> Result<(), Box<dyn Error>> {
    let Some(watcher) = state.watch_notifications().await else {
        return Err("Not logged in".into());
    };
    let mut count = watcher.subscribe();
    println!("Watching notifications, Ctrl-C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = count.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("Unread notifications: {}", *count.borrow_and_update());
            }
        }
    }
    watcher.cancel();
    Ok(())
}

fn format_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
