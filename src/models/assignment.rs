// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ClientError;

/// Body sent on submit and resubmit.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct AssignmentWork {
    #[validate(length(min = 1, message = "Submission content must not be empty."))]
    pub content: String,
}

impl AssignmentWork {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Lifecycle of an uploaded-file assignment submission.
/// Unlike timed assessments, a submission may be replaced until it is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    NotSubmitted,
    Submitted,
    Resubmitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub assignment_id: String,
    pub status: AssignmentStatus,
    pub grade: Option<f64>,
    pub resubmissions: u32,
}

impl AssignmentSubmission {
    pub fn new(assignment_id: impl Into<String>) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            status: AssignmentStatus::NotSubmitted,
            grade: None,
            resubmissions: 0,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }

    pub fn can_resubmit(&self) -> bool {
        self.status != AssignmentStatus::NotSubmitted && !self.is_graded()
    }

    /// First submission. A second call must go through `resubmit`.
    pub fn submit(&mut self) -> Result<(), ClientError> {
        if self.status != AssignmentStatus::NotSubmitted {
            return Err(ClientError::ValidationFailure(format!(
                "assignment {} already submitted; use resubmit",
                self.assignment_id
            )));
        }
        self.status = AssignmentStatus::Submitted;
        Ok(())
    }

    pub fn resubmit(&mut self) -> Result<(), ClientError> {
        if self.status == AssignmentStatus::NotSubmitted {
            return Err(ClientError::ValidationFailure(format!(
                "assignment {} has no submission to replace",
                self.assignment_id
            )));
        }
        if self.is_graded() {
            return Err(ClientError::ValidationFailure(format!(
                "assignment {} is already graded",
                self.assignment_id
            )));
        }
        self.status = AssignmentStatus::Resubmitted;
        self.resubmissions += 1;
        Ok(())
    }

    /// Records the server-assigned grade; terminal for resubmission.
    pub fn record_grade(&mut self, grade: f64) -> Result<(), ClientError> {
        if self.status == AssignmentStatus::NotSubmitted {
            return Err(ClientError::ValidationFailure(format!(
                "assignment {} cannot be graded before submission",
                self.assignment_id
            )));
        }
        self.grade = Some(grade);
        Ok(())
    }
}
