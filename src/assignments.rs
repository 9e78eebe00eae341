// src/assignments.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    api::AssignmentApi,
    error::ClientError,
    models::assignment::{AssignmentSubmission, AssignmentWork},
};

/// Sends assignment work for the logged-in student.
///
/// Every call checks the transition on the local [`AssignmentSubmission`]
/// before touching the network, and only commits it once the server accepts.
#[derive(Clone)]
pub struct AssignmentClient {
    api: Arc<dyn AssignmentApi>,
    token: String,
}

impl AssignmentClient {
    pub fn new(api: Arc<dyn AssignmentApi>, token: impl Into<String>) -> Self {
        Self {
            api,
            token: token.into(),
        }
    }

    pub async fn submit(
        &self,
        submission: &mut AssignmentSubmission,
        work: &AssignmentWork,
    ) -> Result<(), ClientError> {
        work.validate()?;
        let mut next = submission.clone();
        next.submit()?;

        self.api
            .submit_assignment(&self.token, &submission.assignment_id, work)
            .await
            .map_err(|e| {
                tracing::warn!("Assignment {} submit failed: {}", submission.assignment_id, e);
                e
            })?;

        tracing::info!("Assignment {} submitted", submission.assignment_id);
        *submission = next;
        Ok(())
    }

    /// Replaces an ungraded submission.
    pub async fn resubmit(
        &self,
        submission: &mut AssignmentSubmission,
        work: &AssignmentWork,
    ) -> Result<(), ClientError> {
        work.validate()?;
        let mut next = submission.clone();
        next.resubmit()?;

        self.api
            .resubmit_assignment(&self.token, &submission.assignment_id, work)
            .await
            .map_err(|e| {
                tracing::warn!("Assignment {} resubmit failed: {}", submission.assignment_id, e);
                e
            })?;

        tracing::info!(
            "Assignment {} resubmitted ({} so far)",
            submission.assignment_id,
            next.resubmissions
        );
        *submission = next;
        Ok(())
    }
}
