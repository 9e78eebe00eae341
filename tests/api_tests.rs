// tests/api_tests.rs

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
};
use lms_client::{
    ClientError, ClientState,
    assessment::{AssessmentError, SubmitTrigger},
    config::Config,
    models::{
        assessment::AssessmentKind,
        assignment::{AssignmentStatus, AssignmentSubmission, AssignmentWork},
        user::{Credentials, RegisterRequest, Role},
    },
    session::{Capability, RouteDecision},
    storage::{KeyValueStore, MemoryStore, keys},
};
use serde_json::{Value, json};

const TOKEN: &str = "tok-student";

/// Records what the client sent, so tests can assert on it.
#[derive(Default)]
struct MockBackend {
    submits: AtomicUsize,
    last_submit: Mutex<Option<Value>>,
    assignment_calls: Mutex<Vec<(String, String, Value)>>,
}

type Shared = Arc<MockBackend>;
type Reply = (StatusCode, Json<Value>);

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn unauthorized() -> Reply {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No token" })))
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["email"] == "a@b.com" && body["password"] == "secret123" {
        (
            StatusCode::OK,
            Json(json!({
                "token": TOKEN,
                "user": { "_id": "stu1", "name": "Ada", "role": "student", "isApproved": true }
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
    }
}

async fn register(Json(body): Json<Value>) -> Reply {
    if body["role"] == "student" {
        (StatusCode::CREATED, Json(json!({ "message": "Registered" })))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid role" })))
    }
}

async fn forgot_password(Json(_body): Json<Value>) -> Reply {
    (StatusCode::OK, Json(json!({ "message": "Email sent" })))
}

async fn reset_password(Path(reset_token): Path<String>) -> Reply {
    if reset_token == "good" {
        (StatusCode::OK, Json(json!({ "message": "Password reset" })))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "Token expired" })))
    }
}

async fn get_quiz(Path(id): Path<String>, headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Quiz not found" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "quiz": {
                "_id": id,
                "title": "Chapter 1",
                "timeLimitMinutes": 10,
                "questions": [
                    {
                        "_id": "q1",
                        "questionText": "Capital of China?",
                        "type": "multiple-choice",
                        "options": ["Beijing", "Xi'an"],
                        "points": 2
                    },
                    { "_id": "q2", "questionText": "Explain dougong.", "type": "open-ended" }
                ]
            }
        })),
    )
}

async fn get_exam(Path(id): Path<String>, headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "_id": id,
            "title": "Final",
            "timeLimitMinutes": 60,
            "questions": [
                { "_id": "e1", "questionText": "One", "type": "open-ended" },
                { "_id": "e2", "questionText": "Two", "type": "open-ended" },
                { "_id": "e3", "questionText": "Three", "type": "open-ended" }
            ]
        })),
    )
}

async fn submit(
    State(backend): State<Shared>,
    Path(_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.submits.fetch_add(1, Ordering::SeqCst);
    *backend.last_submit.lock().unwrap() = Some(body);
    (StatusCode::OK, Json(json!({ "message": "Submitted" })))
}

async fn assignment_submit(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend
        .assignment_calls
        .lock()
        .unwrap()
        .push(("submit".to_string(), id, body));
    (StatusCode::CREATED, Json(json!({ "message": "Assignment submitted" })))
}

async fn assignment_resubmit(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == "closed" {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "Deadline passed" })));
    }
    backend
        .assignment_calls
        .lock()
        .unwrap()
        .push(("resubmit".to_string(), id, body));
    (StatusCode::OK, Json(json!({ "message": "Assignment resubmitted" })))
}

async fn unread_count(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({ "count": 3 })))
}

/// Helper function to spawn the mock backend on a random port.
/// Returns the API base URL (e.g., "http://127.0.0.1:12345/api").
async fn spawn_backend() -> (String, Shared) {
    let backend = Shared::default();

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/{token}", post(reset_password))
        .route("/quizzes/{id}", get(get_quiz))
        .route("/quizzes/{id}/submit", post(submit))
        .route("/exams/{id}", get(get_exam))
        .route("/exams/{id}/submit", post(submit))
        .route("/assignments/{id}/submit", post(assignment_submit))
        .route("/assignments/{id}/resubmit", put(assignment_resubmit))
        .route("/notifications/unread-count", get(unread_count))
        .with_state(backend.clone());
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}/api", port), backend)
}

async fn spawn_client(base_url: &str) -> (ClientState, Arc<MemoryStore>) {
    let base_url = base_url.to_string();
    let config = Config::from_lookup(|key| match key {
        "LMS_BACKEND_URL" => Some(base_url.clone()),
        "LMS_NOTIFICATION_POLL_SECS" => Some("1".to_string()),
        _ => None,
    })
    .expect("valid test config");

    let store = Arc::new(MemoryStore::new());
    let state = ClientState::with_store(config, store.clone())
        .await
        .expect("Failed to build client state");
    (state, store)
}

async fn logged_in(base_url: &str) -> (ClientState, Arc<MemoryStore>) {
    let (state, store) = spawn_client(base_url).await;
    state
        .session
        .authenticate(&Credentials::new("a@b.com", "secret123"))
        .await
        .expect("login should succeed");
    (state, store)
}

#[tokio::test]
async fn test_login_then_route_allowed() {
    // Arrange
    let (address, _) = spawn_backend().await;
    let (state, store) = spawn_client(&address).await;

    // Act
    let session = state
        .session
        .authenticate(&Credentials::new("a@b.com", "secret123"))
        .await
        .unwrap();

    // Assert
    assert_eq!(session.token, TOKEN);
    assert_eq!(store.get(keys::TOKEN).await.unwrap().as_deref(), Some(TOKEN));
    assert_eq!(store.get(keys::IS_APPROVED).await.unwrap().as_deref(), Some("true"));
    assert_eq!(
        state.session.authorize_route(Capability::ViewCourse).await.unwrap(),
        RouteDecision::Allow
    );
}

#[tokio::test]
async fn test_wrong_password_is_auth_failure() {
    let (address, _) = spawn_backend().await;
    let (state, store) = spawn_client(&address).await;

    let err = state
        .session
        .authenticate(&Credentials::new("a@b.com", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::AuthFailure("Invalid credentials".to_string()));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_account_recovery_statuses_pass_through() {
    let (address, _) = spawn_backend().await;
    let (state, store) = spawn_client(&address).await;

    let request = RegisterRequest {
        name: "Ada".to_string(),
        email: "a@b.com".to_string(),
        password: "secret123".to_string(),
        role: Role::Student,
    };
    assert_eq!(state.session.register(&request).await.unwrap(), 201);
    assert_eq!(state.session.forgot_password("a@b.com").await.unwrap(), 200);
    assert_eq!(state.session.reset_password("good", "newpass1").await.unwrap(), 200);
    assert_eq!(state.session.reset_password("stale", "newpass1").await.unwrap(), 400);

    // None of these log the user in
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (state, _) = spawn_client(&format!("http://127.0.0.1:{}/api", port)).await;
    let err = state
        .session
        .authenticate(&Credentials::new("a@b.com", "secret123"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::NetworkFailure(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_quiz_fetch_and_submit() {
    let (address, backend) = spawn_backend().await;
    let (state, store) = logged_in(&address).await;

    // Act: open, answer, submit
    let runner = state.open_assessment(AssessmentKind::Quiz, "quiz-1").await.unwrap();
    let attempt = runner.attempt().await;
    assert_eq!(attempt.title, "Chapter 1");
    assert_eq!(attempt.questions.len(), 2);
    assert_eq!(attempt.total_points(), 3);

    let remaining = runner.remaining().borrow().unwrap();
    assert!((599..=600).contains(&remaining));
    assert!(store.get("quiz-quiz-1-startTime").await.unwrap().is_some());

    runner.record_answer("q1", "Beijing").await.unwrap();
    let done = runner.submit(SubmitTrigger::User).await.unwrap();

    // Assert
    assert_eq!(done.answers_submitted, 1);
    assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
    let body = backend.last_submit.lock().unwrap().clone().unwrap();
    assert_eq!(
        body,
        json!({ "answers": [{ "questionId": "q1", "response": "Beijing" }] })
    );
    assert_eq!(store.get("quiz-quiz-1-startTime").await.unwrap(), None);
}

#[tokio::test]
async fn test_exam_with_unanswered_questions_is_not_sent() {
    let (address, backend) = spawn_backend().await;
    let (state, _) = logged_in(&address).await;

    let runner = state.open_assessment(AssessmentKind::Exam, "exam-1").await.unwrap();
    runner.record_answer("e1", "only one").await.unwrap();

    let err = runner.submit(SubmitTrigger::User).await.unwrap_err();

    assert_eq!(err, AssessmentError::ValidationFailed { unanswered: 2 });
    assert_eq!(backend.submits.load(Ordering::SeqCst), 0);
    runner.teardown();
}

#[tokio::test]
async fn test_stale_anchor_auto_submits_on_open() {
    let (address, backend) = spawn_backend().await;
    let (state, store) = logged_in(&address).await;

    let long_ago = chrono::Utc::now().timestamp_millis() - 2 * 60 * 60 * 1000;
    store
        .set("quiz-quiz-2-startTime", &long_ago.to_string())
        .await
        .unwrap();

    let runner = state.open_assessment(AssessmentKind::Quiz, "quiz-2").await.unwrap();
    assert_eq!(*runner.remaining().borrow(), Some(0));

    let mut status = runner.status();
    runner.start_countdown();
    tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| s.is_submitted()))
        .await
        .expect("auto-submit did not happen")
        .expect("runner dropped");

    assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ids_with_reserved_characters_stay_one_segment() {
    let (address, _) = spawn_backend().await;
    let (state, _) = logged_in(&address).await;

    let runner = state
        .open_assessment(AssessmentKind::Quiz, "unit 1/part?2")
        .await
        .unwrap();

    assert_eq!(runner.attempt().await.assessment_id, "unit 1/part?2");
    runner.teardown();
}

#[tokio::test]
async fn test_missing_assessment_is_load_failure() {
    let (address, _) = spawn_backend().await;
    let (state, store) = logged_in(&address).await;

    let err = state
        .open_assessment(AssessmentKind::Quiz, "missing")
        .await
        .err()
        .unwrap();

    assert_eq!(
        err,
        AssessmentError::LoadFailed(ClientError::ServerRejection {
            status: 404,
            message: "Quiz not found".to_string()
        })
    );
    assert_eq!(store.get("quiz-missing-startTime").await.unwrap(), None);
}

#[tokio::test]
async fn test_open_assessment_requires_login() {
    let (address, _) = spawn_backend().await;
    let (state, _) = spawn_client(&address).await;

    let err = state
        .open_assessment(AssessmentKind::Quiz, "quiz-1")
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        AssessmentError::LoadFailed(ClientError::AuthFailure(_))
    ));
}

#[tokio::test]
async fn test_notification_watcher_polls_and_cancels() {
    let (address, _) = spawn_backend().await;
    let (state, _) = logged_in(&address).await;

    let watcher = state.watch_notifications().await.expect("logged in");
    let mut count = watcher.subscribe();
    tokio::time::timeout(Duration::from_secs(5), count.wait_for(|c| *c == 3))
        .await
        .expect("count never arrived")
        .expect("watcher dropped");
    assert_eq!(watcher.count(), 3);

    watcher.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(watcher.is_stopped());

    state.dispose().await;
}

#[tokio::test]
async fn test_assignment_submit_then_resubmit() {
    let (address, backend) = spawn_backend().await;
    let (state, _) = logged_in(&address).await;
    let assignments = state.assignments().await.expect("logged in");

    let mut submission = AssignmentSubmission::new("as1");
    assignments
        .submit(&mut submission, &AssignmentWork::new("first draft"))
        .await
        .unwrap();
    assert_eq!(submission.status, AssignmentStatus::Submitted);

    assignments
        .resubmit(&mut submission, &AssignmentWork::new("final draft"))
        .await
        .unwrap();
    assert_eq!(submission.status, AssignmentStatus::Resubmitted);
    assert_eq!(submission.resubmissions, 1);

    let calls = backend.assignment_calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            ("submit".to_string(), "as1".to_string(), json!({ "content": "first draft" })),
            ("resubmit".to_string(), "as1".to_string(), json!({ "content": "final draft" })),
        ]
    );
}

#[tokio::test]
async fn test_assignment_invalid_transitions_never_reach_server() {
    let (address, backend) = spawn_backend().await;
    let (state, _) = logged_in(&address).await;
    let assignments = state.assignments().await.expect("logged in");

    // Nothing to replace yet
    let mut fresh = AssignmentSubmission::new("as2");
    let err = assignments
        .resubmit(&mut fresh, &AssignmentWork::new("text"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ValidationFailure(_)));
    assert_eq!(fresh.status, AssignmentStatus::NotSubmitted);

    // Empty work
    let err = assignments
        .submit(&mut fresh, &AssignmentWork::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ValidationFailure(_)));

    // Graded work is final
    let mut graded = AssignmentSubmission::new("as3");
    graded.submit().unwrap();
    graded.record_grade(9.0).unwrap();
    let err = assignments
        .resubmit(&mut graded, &AssignmentWork::new("late fix"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ValidationFailure(_)));
    assert_eq!(graded.resubmissions, 0);

    assert!(backend.assignment_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_assignment_rejection_keeps_previous_state() {
    let (address, _) = spawn_backend().await;
    let (state, _) = logged_in(&address).await;
    let assignments = state.assignments().await.expect("logged in");

    let mut submission = AssignmentSubmission::new("closed");
    assignments
        .submit(&mut submission, &AssignmentWork::new("on time"))
        .await
        .unwrap();

    let err = assignments
        .resubmit(&mut submission, &AssignmentWork::new("too late"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::ServerRejection {
            status: 403,
            message: "Deadline passed".to_string()
        }
    );
    assert_eq!(submission.status, AssignmentStatus::Submitted);
    assert_eq!(submission.resubmissions, 0);
}
