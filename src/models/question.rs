// src/models/question.rs

use serde::{Deserialize, Serialize};

/// A question as delivered inside an assessment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "questionText", default)]
    pub text: String,

    /// Raw point value. Missing, null or zero means one point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,

    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Question variants, tagged by the `type` field on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        #[serde(default)]
        options: Vec<String>,
        /// Hidden from students by some endpoints.
        #[serde(rename = "correctAnswer", default, skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },
    OpenEnded,
}

impl Question {
    pub fn points(&self) -> u32 {
        match self.points {
            Some(p) if p > 0 => p,
            _ => 1,
        }
    }

    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.kind, QuestionKind::MultipleChoice { .. })
    }

    pub fn correct_answer(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::MultipleChoice { correct_answer, .. } => correct_answer.as_deref(),
            QuestionKind::OpenEnded => None,
        }
    }
}

/// Sum of question points; the denominator for percentage display.
pub fn total_points(questions: &[Question]) -> u32 {
    questions.iter().map(Question::points).sum()
}
