// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::ClientError;

pub const DEFAULT_STORAGE_URL: &str = "sqlite://lms-client.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_NOTIFICATION_POLL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub storage_url: String,
    pub rust_log: String,
    pub log_dir: String,
    pub request_timeout_secs: u64,
    pub notification_poll_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ClientError> {
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("LMS_BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ClientError::Config("LMS_BACKEND_URL must be set".to_string()))?;

        let storage_url =
            lookup("LMS_STORAGE_URL").unwrap_or_else(|| DEFAULT_STORAGE_URL.to_string());

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let log_dir = lookup("LMS_LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        let request_timeout_secs = parse_secs(
            &lookup,
            "LMS_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let notification_poll_secs = parse_secs(
            &lookup,
            "LMS_NOTIFICATION_POLL_SECS",
            DEFAULT_NOTIFICATION_POLL_SECS,
        )?;

        Ok(Self {
            backend_url,
            storage_url,
            rust_log,
            log_dir,
            request_timeout_secs,
            notification_poll_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_secs)
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ClientError::Config(format!(
                "{} must be a positive number of seconds, got '{}'",
                key, raw
            ))),
            Ok(secs) => Ok(secs),
        },
    }
}
