// src/api/client.rs

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    api::{AssessmentApi, AssignmentApi, AuthApi, NotificationApi},
    config::Config,
    error::{ClientError, ErrorBody},
    models::{
        assessment::{AssessmentDefinition, AssessmentKind, DefinitionEnvelope, SubmitAnswersRequest},
        assignment::AssignmentWork,
        notification::UnreadCount,
        user::{
            Credentials, EditProfileRequest, ForgotPasswordRequest, LoginResponse, Profile,
            RegisterRequest, ResetPasswordRequest,
        },
    },
};

/// HTTP implementation of the backend contract.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Self::with_http(http, &config.backend_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!("{} cannot be a base URL", base_url)));
        }

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` under the base path. Each segment is percent-encoded,
    /// so ids and tokens can never add path levels or a query.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turns non-2xx responses into `ServerRejection` with the server's message.
    async fn ensure_success(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let message = ErrorBody::message_from(&raw, status.canonical_reason().unwrap_or("error"));
        Err(ClientError::ServerRejection {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ClientError::from)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["auth", "login"])?)
            .json(credentials)
            .send()
            .await?;

        let response = Self::ensure_success(response).await.map_err(|e| match e {
            // 400/401/403/404 all mean the credentials were not accepted
            ClientError::ServerRejection { status, message }
                if matches!(status, 400 | 401 | 403 | 404) =>
            {
                ClientError::AuthFailure(message)
            }
            other => other,
        })?;

        Self::json(response).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<u16, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["auth", "register"])?)
            .json(request)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }

    async fn forgot_password(&self, email: &str) -> Result<u16, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["auth", "forgot-password"])?)
            .json(&ForgotPasswordRequest { email })
            .send()
            .await?;

        Ok(response.status().as_u16())
    }

    async fn reset_password(&self, reset_token: &str, password: &str) -> Result<u16, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["auth", "reset-password", reset_token])?)
            .json(&ResetPasswordRequest { password })
            .send()
            .await?;

        Ok(response.status().as_u16())
    }

    async fn fetch_profile(&self, token: &str) -> Result<Profile, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["users", "get-profile"])?)
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Self::json(response).await
    }

    async fn update_profile_name(&self, token: &str, name: &str) -> Result<u16, ClientError> {
        let response = self
            .http
            .put(self.endpoint(&["users", "edit-profile"])?)
            .bearer_auth(token)
            .json(&EditProfileRequest { name })
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl AssessmentApi for ApiClient {
    async fn fetch_assessment(
        &self,
        token: &str,
        kind: AssessmentKind,
        id: &str,
    ) -> Result<AssessmentDefinition, ClientError> {
        let url = self.endpoint(&[kind.collection(), id])?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let response = Self::ensure_success(response).await.map_err(|e| {
            tracing::warn!("Failed to fetch {} {}: {}", kind, id, e);
            e
        })?;

        let envelope: DefinitionEnvelope = Self::json(response).await?;
        let mut definition = envelope.into_definition();
        if definition.id.is_empty() {
            definition.id = id.to_string();
        }
        Ok(definition)
    }

    async fn submit_assessment(
        &self,
        token: &str,
        kind: AssessmentKind,
        id: &str,
        request: &SubmitAnswersRequest,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&[kind.collection(), id, "submit"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AssignmentApi for ApiClient {
    async fn submit_assignment(
        &self,
        token: &str,
        id: &str,
        work: &AssignmentWork,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["assignments", id, "submit"])?)
            .bearer_auth(token)
            .json(work)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn resubmit_assignment(
        &self,
        token: &str,
        id: &str,
        work: &AssignmentWork,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.endpoint(&["assignments", id, "resubmit"])?)
            .bearer_auth(token)
            .json(work)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn unread_count(&self, token: &str) -> Result<u64, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["notifications", "unread-count"])?)
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body: UnreadCount = Self::json(response).await?;
        Ok(body.count)
    }
}
