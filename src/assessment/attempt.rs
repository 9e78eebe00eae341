// src/assessment/attempt.rs

use std::collections::HashMap;

use crate::{
    assessment::AssessmentError,
    models::{
        assessment::{AnswerEntry, AssessmentDefinition, AssessmentKind, SubmitAnswersRequest},
        question::{Question, total_points},
    },
};

/// Seconds left before the deadline anchored at `started_at_millis`, floored at 0.
///
/// Partial seconds already elapsed count as elapsed, so a reload never gains time.
pub fn remaining_seconds(time_limit_minutes: u32, started_at_millis: i64, now_millis: i64) -> u64 {
    let total = i64::from(time_limit_minutes) * 60;
    let elapsed = now_millis.saturating_sub(started_at_millis).max(0) / 1000;
    (total - elapsed).max(0) as u64
}

/// One user's in-progress attempt at a quiz or exam.
#[derive(Debug, Clone)]
pub struct AssessmentAttempt {
    pub assessment_id: String,
    pub kind: AssessmentKind,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub time_limit_minutes: Option<u32>,
    /// First-view timestamp (ms since epoch); set only for timed attempts.
    pub started_at: Option<i64>,
    pub answers: HashMap<String, String>,
    pub submitted: bool,
}

impl AssessmentAttempt {
    pub fn new(kind: AssessmentKind, definition: AssessmentDefinition, started_at: Option<i64>) -> Self {
        Self {
            time_limit_minutes: definition.time_limit(),
            assessment_id: definition.id,
            kind,
            title: definition.title,
            description: definition.description,
            questions: definition.questions,
            started_at,
            answers: HashMap::new(),
            submitted: false,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit_minutes.is_some()
    }

    pub fn remaining_seconds(&self, now_millis: i64) -> Option<u64> {
        match (self.time_limit_minutes, self.started_at) {
            (Some(limit), Some(started_at)) => Some(remaining_seconds(limit, started_at, now_millis)),
            _ => None,
        }
    }

    /// Upserts the response for `question_id`. Last write wins.
    pub fn record_answer(
        &mut self,
        question_id: impl Into<String>,
        response: impl Into<String>,
    ) -> Result<(), AssessmentError> {
        if self.submitted {
            return Err(AssessmentError::AlreadySubmitted);
        }
        self.answers.insert(question_id.into(), response.into());
        Ok(())
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    /// Questions with no recorded response (blank responses count as unanswered).
    pub fn unanswered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| {
                self.answers
                    .get(&q.id)
                    .is_none_or(|r| r.trim().is_empty())
            })
            .count()
    }

    pub fn total_points(&self) -> u32 {
        total_points(&self.questions)
    }

    /// Answers in question order, followed by answers to ids outside the definition.
    pub fn submission_payload(&self) -> SubmitAnswersRequest {
        let mut answers: Vec<AnswerEntry> = self
            .questions
            .iter()
            .filter_map(|q| {
                self.answers.get(&q.id).map(|r| AnswerEntry {
                    question_id: q.id.clone(),
                    response: r.clone(),
                })
            })
            .collect();

        let mut extra: Vec<AnswerEntry> = self
            .answers
            .iter()
            .filter(|(id, _)| !self.questions.iter().any(|q| &q.id == *id))
            .map(|(id, r)| AnswerEntry {
                question_id: id.clone(),
                response: r.clone(),
            })
            .collect();
        extra.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        answers.extend(extra);

        SubmitAnswersRequest { answers }
    }
}
