// src/models/submission.rs

use serde::{Deserialize, Serialize};

use crate::models::{
    assessment::AssessmentDefinition,
    question::{Question, total_points},
};

/// A student's submission as embedded in the assessment definition.
/// Scores are authoritative server values; the client never recomputes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(rename = "pointsAwarded", default)]
    pub points_awarded: Option<f64>,
}

/// Per-question line of a graded result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub question_text: String,
    pub points: u32,
    pub response: Option<String>,
    pub correct_answer: Option<String>,
    pub points_awarded: Option<f64>,
    pub feedback: Option<String>,
}

/// Read-only grade view for one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeResult {
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub total_points: u32,
    pub per_question: Vec<QuestionResult>,
}

impl GradeResult {
    /// Score as a percentage of the total points, `None` until graded.
    pub fn percentage(&self) -> Option<f64> {
        let score = self.score?;
        if self.total_points == 0 {
            return None;
        }
        Some(score / f64::from(self.total_points) * 100.0)
    }

    pub fn is_graded(&self) -> bool {
        self.score.is_some()
    }
}

/// Builds the grade view for `student_id` from a fetched definition.
/// Returns `None` when the student has not submitted yet.
pub fn grade_for_student(definition: &AssessmentDefinition, student_id: &str) -> Option<GradeResult> {
    let submission = definition
        .submissions
        .iter()
        .find(|s| s.student_id == student_id)?;

    let per_question = definition
        .questions
        .iter()
        .map(|q| question_result(q, submission))
        .collect();

    Some(GradeResult {
        score: submission.score,
        feedback: submission.feedback.clone(),
        total_points: total_points(&definition.questions),
        per_question,
    })
}

fn question_result(question: &Question, submission: &SubmissionRecord) -> QuestionResult {
    let answer = submission
        .answers
        .iter()
        .find(|a| a.question_id == question.id);

    QuestionResult {
        question_id: question.id.clone(),
        question_text: question.text.clone(),
        points: question.points(),
        response: answer.map(|a| a.response.clone()),
        correct_answer: question.correct_answer().map(str::to_string),
        points_awarded: answer.and_then(|a| a.points_awarded),
        feedback: answer.and_then(|a| a.feedback.clone()),
    }
}
