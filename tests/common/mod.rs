// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use lms_client::{
    ClientError,
    api::{AssessmentApi, AuthApi},
    models::{
        assessment::{AssessmentDefinition, AssessmentKind, SubmitAnswersRequest},
        user::{Credentials, LoginResponse, Profile, RegisterRequest},
    },
    storage::{KeyValueStore, MemoryStore},
};

/// Builds a definition with `count` open-ended questions `q1..qN`.
pub fn definition(id: &str, count: usize, time_limit_minutes: Option<u32>) -> AssessmentDefinition {
    let questions: Vec<_> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "_id": format!("q{}", i),
                "questionText": format!("Question {}", i),
                "type": "open-ended",
                "points": 2
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "_id": id,
        "title": format!("Assessment {}", id),
        "questions": questions,
        "timeLimitMinutes": time_limit_minutes,
    }))
    .expect("valid definition")
}

/// In-process assessment backend that counts submit calls.
pub struct FakeAssessmentApi {
    pub definition: AssessmentDefinition,
    pub fetches: AtomicUsize,
    pub submits: AtomicUsize,
    /// Number of upcoming submit calls that fail.
    pub failures_left: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub submit_delay: Duration,
    pub last_payload: Mutex<Option<SubmitAnswersRequest>>,
}

impl FakeAssessmentApi {
    pub fn new(definition: AssessmentDefinition) -> Self {
        Self {
            definition,
            fetches: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            submit_delay: Duration::ZERO,
            last_payload: Mutex::new(None),
        }
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<SubmitAnswersRequest> {
        self.last_payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssessmentApi for FakeAssessmentApi {
    async fn fetch_assessment(
        &self,
        _token: &str,
        _kind: AssessmentKind,
        _id: &str,
    ) -> Result<AssessmentDefinition, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ClientError::NetworkFailure("connection refused".into()));
        }
        Ok(self.definition.clone())
    }

    async fn submit_assessment(
        &self,
        _token: &str,
        _kind: AssessmentKind,
        _id: &str,
        request: &SubmitAnswersRequest,
    ) -> Result<(), ClientError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ClientError::ServerRejection {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }

        *self.last_payload.lock().unwrap() = Some(request.clone());
        Ok(())
    }
}

/// Auth backend returning canned responses.
pub struct FakeAuthApi {
    pub login_response: Mutex<Result<serde_json::Value, ClientError>>,
    pub profile_approved: AtomicBool,
    pub logins: AtomicUsize,
}

impl FakeAuthApi {
    pub fn new(login_response: Result<serde_json::Value, ClientError>) -> Self {
        Self {
            login_response: Mutex::new(login_response),
            profile_approved: AtomicBool::new(false),
            logins: AtomicUsize::new(0),
        }
    }

    pub fn login_ok(token: &str, role: &str, approved: Option<bool>) -> Self {
        Self::new(Ok(login_body(token, role, approved)))
    }
}

pub fn login_body(token: &str, role: &str, approved: Option<bool>) -> serde_json::Value {
    serde_json::json!({
        "token": token,
        "user": { "_id": "u1", "name": "Ada", "role": role, "isApproved": approved }
    })
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        let canned = self.login_response.lock().unwrap().clone()?;
        Ok(serde_json::from_value(canned)?)
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<u16, ClientError> {
        Ok(201)
    }

    async fn forgot_password(&self, _email: &str) -> Result<u16, ClientError> {
        Ok(200)
    }

    async fn reset_password(&self, _reset_token: &str, _password: &str) -> Result<u16, ClientError> {
        Ok(200)
    }

    async fn fetch_profile(&self, _token: &str) -> Result<Profile, ClientError> {
        Ok(serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Ada",
            "role": "student",
            "isApproved": self.profile_approved.load(Ordering::SeqCst)
        }))?)
    }

    async fn update_profile_name(&self, _token: &str, _name: &str) -> Result<u16, ClientError> {
        Ok(200)
    }
}

/// Store whose batch writes fail, for atomicity checks.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.inner.remove(key).await
    }

    async fn set_many(&self, _entries: &[(&str, String)]) -> Result<(), ClientError> {
        Err(ClientError::Storage("disk full".into()))
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), ClientError> {
        self.inner.remove_many(keys).await
    }
}
