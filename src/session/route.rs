// src/session/route.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{error::ClientError, models::user::Role, session::Session};

/// Navigation targets reachable behind the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ViewCourse,
    TakeAssessment,
    SubmitAssignment,
    ViewResults,
    CreateCourse,
    GradeSubmissions,
    ViewChildAnalytics,
    PayFees,
    ApproveAccounts,
    Messaging,
    EditProfile,
}

const ALL_ROLES: &[Role] = &[Role::Student, Role::Teacher, Role::Parent, Role::Admin];

impl Capability {
    /// Roles allowed to reach this capability once authenticated and approved.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Capability::ViewCourse
            | Capability::ViewResults
            | Capability::Messaging
            | Capability::EditProfile => ALL_ROLES,
            Capability::TakeAssessment | Capability::SubmitAssignment => &[Role::Student],
            Capability::CreateCourse | Capability::GradeSubmissions => &[Role::Teacher, Role::Admin],
            Capability::ViewChildAnalytics | Capability::PayFees => &[Role::Parent],
            Capability::ApproveAccounts => &[Role::Admin],
        }
    }
}

impl FromStr for Capability {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| ClientError::ValidationFailure(format!("unknown capability '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Login,
    PendingApproval,
    /// The role's landing page, for capabilities outside the role.
    Dashboard,
}

impl RouteTarget {
    pub fn path(&self) -> &'static str {
        match self {
            RouteTarget::Login => "/login",
            RouteTarget::PendingApproval => "/unapproved",
            RouteTarget::Dashboard => "/dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(RouteTarget),
}

/// Route guard decision table.
///
/// | token | role    | approved | outcome                    |
/// |-------|---------|----------|----------------------------|
/// | no    | -       | -        | redirect to login          |
/// | yes   | student | false    | redirect to pending        |
/// | yes   | any     | true/n-a | allow (if role permitted)  |
pub fn authorize(session: &Session, capability: Capability) -> RouteDecision {
    if !session.is_authenticated() {
        return RouteDecision::Redirect(RouteTarget::Login);
    }

    let Some(role) = session.role else {
        return RouteDecision::Redirect(RouteTarget::Login);
    };

    if role == Role::Student && !session.approved {
        return RouteDecision::Redirect(RouteTarget::PendingApproval);
    }

    if capability.allowed_roles().contains(&role) {
        RouteDecision::Allow
    } else {
        RouteDecision::Redirect(RouteTarget::Dashboard)
    }
}
