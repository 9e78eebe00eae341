// src/api/mod.rs

//! REST contract the session and assessment components depend on.
//!
//! The traits are the seam between the components and the transport; the
//! production implementation is [`ApiClient`].

use async_trait::async_trait;

use crate::{
    error::ClientError,
    models::{
        assessment::{AssessmentDefinition, AssessmentKind, SubmitAnswersRequest},
        assignment::AssignmentWork,
        user::{Credentials, LoginResponse, Profile, RegisterRequest},
    },
};

pub mod client;

pub use client::ApiClient;

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST auth/login`. Non-2xx and malformed payloads are errors.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError>;

    /// `POST auth/register`. Returns the bare HTTP status.
    async fn register(&self, request: &RegisterRequest) -> Result<u16, ClientError>;

    /// `POST auth/forgot-password`. Returns the bare HTTP status.
    async fn forgot_password(&self, email: &str) -> Result<u16, ClientError>;

    /// `POST auth/reset-password/{reset_token}`. Returns the bare HTTP status.
    async fn reset_password(&self, reset_token: &str, password: &str) -> Result<u16, ClientError>;

    /// `GET users/get-profile`.
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ClientError>;

    /// `PUT users/edit-profile`. Returns the bare HTTP status.
    async fn update_profile_name(&self, token: &str, name: &str) -> Result<u16, ClientError>;
}

#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// `GET {quizzes|exams}/{id}`.
    async fn fetch_assessment(
        &self,
        token: &str,
        kind: AssessmentKind,
        id: &str,
    ) -> Result<AssessmentDefinition, ClientError>;

    /// `POST {quizzes|exams}/{id}/submit`. Any 2xx is success.
    async fn submit_assessment(
        &self,
        token: &str,
        kind: AssessmentKind,
        id: &str,
        request: &SubmitAnswersRequest,
    ) -> Result<(), ClientError>;
}

#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET notifications/unread-count`.
    async fn unread_count(&self, token: &str) -> Result<u64, ClientError>;
}

#[async_trait]
pub trait AssignmentApi: Send + Sync {
    /// `POST assignments/{id}/submit`. Any 2xx is success.
    async fn submit_assignment(
        &self,
        token: &str,
        id: &str,
        work: &AssignmentWork,
    ) -> Result<(), ClientError>;

    /// `PUT assignments/{id}/resubmit`. Replaces the earlier submission.
    async fn resubmit_assignment(
        &self,
        token: &str,
        id: &str,
        work: &AssignmentWork,
    ) -> Result<(), ClientError>;
}
