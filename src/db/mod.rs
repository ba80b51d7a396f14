// src/db/mod.rs

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    grading::{Finalization, GradeEntry, Submission},
    models::{
        attempt::{AttemptBundle, AttemptGradingStatus, ExamAttempt},
        exam::Exam,
        response::Response,
    },
};

pub use postgres::PgGradingStore;

/// Persistence boundary for exams, attempts and responses.
///
/// Handlers only talk to this trait, so the HTTP layer runs the same against
/// Postgres and against the in-memory store the integration tests use.
#[async_trait]
pub trait GradingStore: Send + Sync {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError>;

    /// Loads an attempt with its exam, the exam's questions (in order) and
    /// the attempt's responses.
    async fn load_attempt(&self, attempt_id: i64) -> Result<Option<AttemptBundle>, AppError>;

    /// Submitted attempts in the given grading state, oldest submission first.
    /// With no status, returns everything still awaiting finalization.
    async fn list_attempts(
        &self,
        status: Option<AttemptGradingStatus>,
        limit: i64,
    ) -> Result<Vec<AttemptBundle>, AppError>;

    async fn create_attempt(
        &self,
        exam_id: i64,
        student_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<ExamAttempt, AppError>;

    /// Stores the student's answers and marks the attempt submitted.
    /// Returns `None` if the attempt was already submitted.
    async fn save_submission(&self, submission: &Submission) -> Result<Option<ExamAttempt>, AppError>;

    /// Upserts the graded response and moves a `pending` attempt to
    /// `in_progress`. Fails with `Conflict` if the attempt is completed.
    async fn save_grade(&self, entry: &GradeEntry) -> Result<Response, AppError>;

    /// Marks the attempt completed. Returns `None` if it already was.
    async fn save_finalization(&self, outcome: &Finalization) -> Result<Option<ExamAttempt>, AppError>;
}
