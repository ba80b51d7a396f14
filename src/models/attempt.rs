// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{exam::Exam, question::{Answer, Question}, response::Response};
use crate::scoring::ScoreSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attempt_grading_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptGradingStatus {
    Pending,
    InProgress,
    Completed,
}

/// Represents the 'exam_attempts' table: one student's try at a unit exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Set when the student submits.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Seconds spent on the attempt.
    pub time_used: Option<i32>,

    pub grading_status: AttemptGradingStatus,
    pub passed: bool,
    pub final_score: Option<f64>,
    pub instructor_feedback: Option<String>,
    pub needs_review: bool,
    pub graded_by: Option<i64>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExamAttempt {
    pub fn is_finalized(&self) -> bool {
        self.grading_status == AttemptGradingStatus::Completed
    }

    pub fn is_submitted(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// An attempt loaded together with everything needed to score it.
#[derive(Debug, Clone)]
pub struct AttemptBundle {
    pub attempt: ExamAttempt,
    pub exam: Exam,
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
}

impl AttemptBundle {
    pub fn question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn response_for(&self, question_id: i64) -> Option<&Response> {
        self.responses.iter().find(|r| r.question_id == question_id)
    }

    /// Replaces the stored response for the same question, or adds it.
    pub fn upsert_response(&mut self, response: Response) {
        match self
            .responses
            .iter_mut()
            .find(|r| r.question_id == response.question_id)
        {
            Some(existing) => *existing = response,
            None => self.responses.push(response),
        }
    }

    pub fn summary(&self) -> ScoreSummary {
        crate::scoring::summarize(
            &self.questions,
            &self.responses,
            self.exam.weights(),
            self.exam.passing_score,
        )
    }
}

/// A question paired with the student's response, for the grading page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingItem {
    pub question: Question,
    pub response: Option<Response>,
}

/// DTO for `GET /api/grading/attempts/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDetail {
    pub attempt: ExamAttempt,
    pub exam: Exam,
    pub items: Vec<GradingItem>,
    pub summary: ScoreSummary,
}

impl From<AttemptBundle> for AttemptDetail {
    fn from(bundle: AttemptBundle) -> Self {
        let summary = bundle.summary();
        let AttemptBundle {
            attempt,
            exam,
            questions,
            responses,
        } = bundle;

        let mut by_question: HashMap<i64, Response> =
            responses.into_iter().map(|r| (r.question_id, r)).collect();

        let items = questions
            .into_iter()
            .map(|question| {
                let response = by_question.remove(&question.id);
                GradingItem { question, response }
            })
            .collect();

        Self {
            attempt,
            exam,
            items,
            summary,
        }
    }
}

/// DTO for one row of the grading queue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub attempt_id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub grading_status: AttemptGradingStatus,
    pub grading_progress: f64,
    pub can_finalize: bool,
}

impl From<&AttemptBundle> for QueueEntry {
    fn from(bundle: &AttemptBundle) -> Self {
        let summary = bundle.summary();
        Self {
            attempt_id: bundle.attempt.id,
            student_id: bundle.attempt.student_id,
            exam_id: bundle.exam.id,
            exam_title: bundle.exam.title.clone(),
            completed_at: bundle.attempt.completed_at,
            grading_status: bundle.attempt.grading_status,
            grading_progress: summary.grading_progress,
            can_finalize: summary.can_finalize,
        }
    }
}

/// Query string of `GET /api/grading/queue`.
#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<AttemptGradingStatus>,
    pub limit: Option<i64>,
}

/// Body of `POST /api/grading/complete`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteGradingRequest {
    pub attempt_id: i64,
    #[validate(length(max = 5000, message = "Feedback must be at most 5000 characters."))]
    pub instructor_feedback: Option<String>,
    #[serde(default)]
    pub needs_review: bool,
    #[validate(range(min = 1))]
    pub grader_id: Option<i64>,
}

/// Body of `POST /api/exams/{id}/attempts`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    #[validate(range(min = 1, message = "A student is required."))]
    pub student_id: i64,
}

/// Body of `POST /api/attempts/{id}/submit`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    /// Key: question id. Value: the student's answer.
    pub answers: HashMap<i64, Answer>,
    #[validate(range(min = 0))]
    pub time_used: Option<i32>,
}

/// DTO returned by the write paths that change an attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptWithSummary {
    pub attempt: ExamAttempt,
    pub summary: ScoreSummary,
}
