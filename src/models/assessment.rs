// src/models/assessment.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ClientError,
    models::{question::Question, submission::SubmissionRecord},
};

/// Quizzes and exams share one structure; the kind only selects paths and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Quiz,
    Exam,
}

impl AssessmentKind {
    /// REST collection segment (`quizzes/{id}`, `exams/{id}`).
    pub fn collection(&self) -> &'static str {
        match self {
            AssessmentKind::Quiz => "quizzes",
            AssessmentKind::Exam => "exams",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Quiz => "quiz",
            AssessmentKind::Exam => "exam",
        }
    }

    /// Storage key holding the first-view timestamp of an attempt.
    pub fn start_time_key(&self, assessment_id: &str) -> String {
        format!("{}-{}-startTime", self.as_str(), assessment_id)
    }
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quiz" | "quizzes" => Ok(AssessmentKind::Quiz),
            "exam" | "exams" => Ok(AssessmentKind::Exam),
            other => Err(ClientError::ValidationFailure(format!(
                "unknown assessment kind '{}'",
                other
            ))),
        }
    }
}

/// Assessment definition as returned by `GET {quizzes|exams}/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentDefinition {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(rename = "timeLimitMinutes", alias = "timeLimit", default)]
    pub time_limit_minutes: Option<u32>,
    /// Course-level due date; informational only, the countdown uses the time limit.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submissions: Vec<SubmissionRecord>,
}

impl AssessmentDefinition {
    /// A zero or missing limit means the assessment is untimed.
    pub fn time_limit(&self) -> Option<u32> {
        self.time_limit_minutes.filter(|m| *m > 0)
    }
}

/// The backend wraps single assessments as `{"quiz": {...}}` / `{"exam": {...}}`;
/// the bare object is accepted as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DefinitionEnvelope {
    Quiz { quiz: AssessmentDefinition },
    Exam { exam: AssessmentDefinition },
    Bare(AssessmentDefinition),
}

impl DefinitionEnvelope {
    pub(crate) fn into_definition(self) -> AssessmentDefinition {
        match self {
            DefinitionEnvelope::Quiz { quiz } => quiz,
            DefinitionEnvelope::Exam { exam } => exam,
            DefinitionEnvelope::Bare(def) => def,
        }
    }
}

/// One answer in a submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub response: String,
}

/// DTO for `POST {quizzes|exams}/{id}/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerEntry>,
}
