// src/models/user.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ClientError;

/// Account role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Parent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            "admin" => Ok(Role::Admin),
            other => Err(ClientError::MalformedResponse(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// DTO for user login.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password must not be empty."))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// DTO for creating a new account (Registration).
#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must not be empty."))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EditProfileRequest<'a> {
    pub name: &'a str,
}

/// User block of the login response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(rename = "isApproved", default)]
    pub is_approved: Option<bool>,
}

/// A child linked to a parent account, denormalized into storage on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Response of `POST auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AuthenticatedUser,
    #[serde(default)]
    pub children: Option<Vec<ChildSummary>>,
}

/// Response of `GET users/get-profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(rename = "isApproved", default)]
    pub is_approved: Option<bool>,
}
