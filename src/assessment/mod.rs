// src/assessment/mod.rs

//! Timed Assessment Runner.
//!
//! Runs one quiz or exam from load to exactly-once submission. The deadline
//! is anchored to a first-view timestamp persisted per assessment, so reloading
//! neither resets nor extends the time limit.

use std::fmt;

use crate::{error::ClientError, models::assessment::AssessmentKind};

pub mod attempt;
pub mod runner;

pub use attempt::{AssessmentAttempt, remaining_seconds};
pub use runner::{AssessmentRunner, RunnerContext, RunnerStatus, SubmissionStatus};

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    User,
    Deadline,
}

/// Pre-submit validation applied to user-triggered submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPolicy {
    /// Accept whatever has been answered.
    AllowPartial,
    /// Reject a manual submit while any question is unanswered.
    RequireAllAnswered,
}

impl SubmitPolicy {
    /// Quizzes accept partial answers; exams require every question answered.
    pub fn default_for(kind: AssessmentKind) -> Self {
        match kind {
            AssessmentKind::Quiz => SubmitPolicy::AllowPartial,
            AssessmentKind::Exam => SubmitPolicy::RequireAllAnswered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    /// Fetching the definition failed; nothing was persisted.
    LoadFailed(ClientError),

    /// Manual submit with unanswered questions; no request was sent.
    ValidationFailed { unanswered: usize },

    /// The submit request failed; answers and the deadline anchor are preserved.
    SubmitFailed(ClientError),

    /// A duplicate trigger lost to an earlier submission. Not user-visible.
    AlreadySubmitted,
}

impl AssessmentError {
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, AssessmentError::AlreadySubmitted)
    }
}

impl fmt::Display for AssessmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentError::LoadFailed(e) => write!(f, "failed to load assessment: {}", e),
            AssessmentError::ValidationFailed { unanswered } => write!(
                f,
                "please answer all questions before submitting ({} unanswered)",
                unanswered
            ),
            AssessmentError::SubmitFailed(e) => write!(f, "failed to submit: {}", e),
            AssessmentError::AlreadySubmitted => write!(f, "already submitted"),
        }
    }
}

impl std::error::Error for AssessmentError {}
