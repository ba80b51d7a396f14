// src/models/response.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use super::question::Answer;

/// Manual grading state of a single response. Moves one way only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "response_grading_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResponseGradingStatus {
    Pending,
    Graded,
}

/// Represents the 'responses' table: one answer to one question in one attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,

    /// Null when an instructor grades a question the student left blank.
    pub answer: Option<Json<Answer>>,

    /// Set at submission time for auto-graded questions.
    pub is_correct: Option<bool>,

    pub instructor_score: Option<f64>,
    pub instructor_feedback: Option<String>,
    pub grading_status: ResponseGradingStatus,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub graded_by: Option<i64>,
}

impl Response {
    pub fn is_graded(&self) -> bool {
        self.grading_status == ResponseGradingStatus::Graded
    }
}

/// Body of `POST /api/grading/update-score`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScoreRequest {
    pub attempt_id: i64,
    pub question_id: i64,
    #[validate(required(message = "A score is required."))]
    pub score: Option<f64>,
    #[validate(length(max = 5000, message = "Feedback must be at most 5000 characters."))]
    pub feedback: Option<String>,
    #[validate(range(min = 1, message = "A grader is required."))]
    pub grader_id: i64,
}
