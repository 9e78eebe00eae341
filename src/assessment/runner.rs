// src/assessment/runner.rs

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, interval_at};

use crate::{
    api::AssessmentApi,
    assessment::{AssessmentAttempt, AssessmentError, SubmitPolicy, SubmitTrigger},
    error::ClientError,
    models::assessment::AssessmentKind,
    storage::KeyValueStore,
    utils::{
        clock::{Clock, SystemClock},
        task::TaskHandle,
    },
};

const TICK: Duration = Duration::from_secs(1);

/// Dependencies a runner needs, injected by the caller.
#[derive(Clone)]
pub struct RunnerContext {
    pub api: Arc<dyn AssessmentApi>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub token: String,
    /// Overrides the per-kind default when set.
    pub policy: Option<SubmitPolicy>,
}

impl RunnerContext {
    pub fn new(
        api: Arc<dyn AssessmentApi>,
        store: Arc<dyn KeyValueStore>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            clock: Arc::new(SystemClock),
            token: token.into(),
            policy: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: SubmitPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// Observable lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    InProgress,
    Submitting(SubmitTrigger),
    Submitted(SubmitTrigger),
    /// The last attempt failed; a manual retry is possible.
    SubmitFailed(SubmitTrigger),
}

impl RunnerStatus {
    pub fn is_submitted(&self) -> bool {
        matches!(self, RunnerStatus::Submitted(_))
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionStatus {
    pub trigger: SubmitTrigger,
    pub answers_submitted: usize,
}

struct RunnerInner {
    api: Arc<dyn AssessmentApi>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    token: String,
    kind: AssessmentKind,
    assessment_id: String,
    policy: SubmitPolicy,
    attempt: Mutex<AssessmentAttempt>,
    /// Single-flight guard around the submit request.
    submitting: AtomicBool,
    torn_down: AtomicBool,
    remaining_tx: watch::Sender<Option<u64>>,
    status_tx: watch::Sender<RunnerStatus>,
    countdown: std::sync::Mutex<Option<TaskHandle>>,
}

/// Cloneable handle to one assessment-taking session.
///
/// The countdown task only holds a weak reference; dropping the last handle
/// (or calling `teardown`) stops it.
#[derive(Clone)]
pub struct AssessmentRunner {
    inner: Arc<RunnerInner>,
}

impl AssessmentRunner {
    /// Fetches the assessment and anchors its deadline.
    ///
    /// The first load records `now` under the attempt's start-time key; later
    /// loads reuse it, so remaining time keeps shrinking across reloads.
    pub async fn load(
        ctx: RunnerContext,
        kind: AssessmentKind,
        assessment_id: &str,
    ) -> Result<Self, AssessmentError> {
        let definition = ctx
            .api
            .fetch_assessment(&ctx.token, kind, assessment_id)
            .await
            .map_err(AssessmentError::LoadFailed)?;

        let started_at = match definition.time_limit() {
            Some(_) => Some(
                anchor_start_time(
                    ctx.store.as_ref(),
                    ctx.clock.as_ref(),
                    &kind.start_time_key(assessment_id),
                )
                .await
                .map_err(AssessmentError::LoadFailed)?,
            ),
            None => None,
        };

        let mut attempt = AssessmentAttempt::new(kind, definition, started_at);
        attempt.assessment_id = assessment_id.to_string();
        let remaining = attempt.remaining_seconds(ctx.clock.now_millis());

        tracing::info!(
            kind = %kind,
            assessment_id,
            questions = attempt.questions.len(),
            remaining_secs = ?remaining,
            "Assessment loaded"
        );

        let (remaining_tx, _) = watch::channel(remaining);
        let (status_tx, _) = watch::channel(RunnerStatus::InProgress);

        Ok(Self {
            inner: Arc::new(RunnerInner {
                api: ctx.api,
                store: ctx.store,
                clock: ctx.clock,
                token: ctx.token,
                kind,
                assessment_id: assessment_id.to_string(),
                policy: ctx.policy.unwrap_or_else(|| SubmitPolicy::default_for(kind)),
                attempt: Mutex::new(attempt),
                submitting: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
                remaining_tx,
                status_tx,
                countdown: std::sync::Mutex::new(None),
            }),
        })
    }

    pub fn kind(&self) -> AssessmentKind {
        self.inner.kind
    }

    pub fn assessment_id(&self) -> &str {
        &self.inner.assessment_id
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.inner.policy
    }

    /// Seconds left, `None` for untimed assessments.
    pub fn remaining(&self) -> watch::Receiver<Option<u64>> {
        self.inner.remaining_tx.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<RunnerStatus> {
        self.inner.status_tx.subscribe()
    }

    pub async fn attempt(&self) -> AssessmentAttempt {
        self.inner.attempt.lock().await.clone()
    }

    pub async fn record_answer(
        &self,
        question_id: impl Into<String>,
        response: impl Into<String>,
    ) -> Result<(), AssessmentError> {
        self.inner
            .attempt
            .lock()
            .await
            .record_answer(question_id, response)
    }

    /// Submits the recorded answers at most once.
    ///
    /// Duplicate triggers (double click, last tick racing a click, late tick
    /// after teardown) return `AlreadySubmitted` without a network call.
    pub async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmissionStatus, AssessmentError> {
        let inner = &self.inner;

        if inner.torn_down.load(Ordering::SeqCst) {
            tracing::debug!(assessment_id = %inner.assessment_id, "Submit after teardown ignored");
            return Err(AssessmentError::AlreadySubmitted);
        }

        if trigger == SubmitTrigger::User && inner.policy == SubmitPolicy::RequireAllAnswered {
            let attempt = inner.attempt.lock().await;
            if attempt.submitted {
                return Err(AssessmentError::AlreadySubmitted);
            }
            // Expiry never blocks submission, including a manual retry after it.
            let expired = *inner.remaining_tx.borrow() == Some(0)
                || attempt.remaining_seconds(inner.clock.now_millis()) == Some(0);
            let unanswered = attempt.unanswered_count();
            if !expired && unanswered > 0 {
                return Err(AssessmentError::ValidationFailed { unanswered });
            }
        }

        if inner
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(?trigger, "Submit already in flight, ignoring duplicate");
            return Err(AssessmentError::AlreadySubmitted);
        }

        let payload = {
            let attempt = inner.attempt.lock().await;
            if attempt.submitted {
                inner.submitting.store(false, Ordering::SeqCst);
                return Err(AssessmentError::AlreadySubmitted);
            }
            attempt.submission_payload()
        };

        inner.status_tx.send_replace(RunnerStatus::Submitting(trigger));
        tracing::info!(
            kind = %inner.kind,
            assessment_id = %inner.assessment_id,
            ?trigger,
            answers = payload.answers.len(),
            "Submitting assessment"
        );

        let result = inner
            .api
            .submit_assessment(&inner.token, inner.kind, &inner.assessment_id, &payload)
            .await;

        match result {
            Ok(()) => {
                inner.attempt.lock().await.submitted = true;

                let key = inner.kind.start_time_key(&inner.assessment_id);
                if let Err(e) = inner.store.remove(&key).await {
                    tracing::warn!("Failed to clear deadline anchor {}: {}", key, e);
                }

                inner.submitting.store(false, Ordering::SeqCst);
                inner.status_tx.send_replace(RunnerStatus::Submitted(trigger));
                if trigger == SubmitTrigger::User {
                    self.stop_countdown();
                }

                tracing::info!(assessment_id = %inner.assessment_id, "Assessment submitted");
                Ok(SubmissionStatus {
                    trigger,
                    answers_submitted: payload.answers.len(),
                })
            }
            Err(e) => {
                tracing::error!(
                    assessment_id = %inner.assessment_id,
                    ?trigger,
                    "Failed to submit assessment: {}",
                    e
                );
                inner.submitting.store(false, Ordering::SeqCst);
                inner.status_tx.send_replace(RunnerStatus::SubmitFailed(trigger));
                Err(AssessmentError::SubmitFailed(e))
            }
        }
    }

    /// Arms the once-per-second countdown. Returns `false` for untimed
    /// assessments or a torn-down runner. Calling it twice keeps one timer.
    pub fn start_countdown(&self) -> bool {
        let Some(initial) = *self.inner.remaining_tx.borrow() else {
            return false;
        };
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return false;
        }

        let mut slot = self
            .inner
            .countdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            let weak = Arc::downgrade(&self.inner);
            *slot = Some(TaskHandle::spawn(run_countdown(weak, initial)));
        }
        true
    }

    /// Releases the countdown; any later trigger is ignored. A deadline
    /// submission that already started still runs to completion.
    pub fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_countdown();
        tracing::debug!(assessment_id = %self.inner.assessment_id, "Runner torn down");
    }

    fn stop_countdown(&self) {
        let handle = self
            .inner
            .countdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }
}

/// Reads the persisted first-view timestamp, recording `now` if absent or unreadable.
async fn anchor_start_time(
    store: &dyn KeyValueStore,
    clock: &dyn Clock,
    key: &str,
) -> Result<i64, ClientError> {
    if let Some(raw) = store.get(key).await? {
        match raw.trim().parse::<i64>() {
            Ok(started_at) => return Ok(started_at),
            Err(_) => tracing::warn!("Replacing unreadable deadline anchor {}={}", key, raw),
        }
    }

    let now = clock.now_millis();
    store.set(key, &now.to_string()).await?;
    Ok(now)
}

async fn run_countdown(runner: Weak<RunnerInner>, initial: u64) {
    let mut remaining = initial;

    if remaining > 0 {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        loop {
            ticker.tick().await;

            let Some(inner) = runner.upgrade() else {
                return;
            };
            if inner.torn_down.load(Ordering::SeqCst) || inner.attempt.lock().await.submitted {
                return;
            }

            remaining = remaining.saturating_sub(1);
            inner.remaining_tx.send_replace(Some(remaining));
            if remaining == 0 {
                break;
            }
        }
    }

    let Some(inner) = runner.upgrade() else {
        return;
    };
    let runner = AssessmentRunner { inner };

    // Detached from the countdown handle: teardown must not abort a request in flight.
    tokio::spawn(async move {
        match runner.submit(SubmitTrigger::Deadline).await {
            Ok(_) => tracing::info!("Time is up, answers submitted automatically"),
            Err(AssessmentError::AlreadySubmitted) => {
                tracing::debug!("Deadline reached after submission")
            }
            Err(e) => tracing::warn!("Automatic submission failed, manual retry required: {}", e),
        }
    });
}
