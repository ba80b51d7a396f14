// src/db/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};

use super::GradingStore;
use crate::{
    error::AppError,
    grading::{Finalization, GradeEntry, Submission},
    models::{
        attempt::{AttemptBundle, AttemptGradingStatus, ExamAttempt},
        exam::Exam,
        question::Question,
        response::{Response, ResponseGradingStatus},
    },
};

const ATTEMPT_COLUMNS: &str = "id, student_id, exam_id, started_at, completed_at, time_used, \
    grading_status, passed, final_score, instructor_feedback, needs_review, graded_by, graded_at";

const EXAM_COLUMNS: &str =
    "id, unit_id, title, passing_score, multiple_choice_weight, free_response_weight, time_limit";

const QUESTION_COLUMNS: &str = "id, exam_id, position, prompt, points, kind";

const RESPONSE_COLUMNS: &str = "id, attempt_id, question_id, answer, is_correct, instructor_score, \
    instructor_feedback, grading_status, graded_at, graded_by";

/// `GradingStore` backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgGradingStore {
    pool: PgPool,
}

impl PgGradingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads exams, questions and responses for a batch of attempts with one
    /// query per table.
    async fn assemble(&self, attempts: Vec<ExamAttempt>) -> Result<Vec<AttemptBundle>, AppError> {
        if attempts.is_empty() {
            return Ok(Vec::new());
        }

        let mut exam_ids: Vec<i64> = attempts.iter().map(|a| a.exam_id).collect();
        exam_ids.sort_unstable();
        exam_ids.dedup();
        let attempt_ids: Vec<i64> = attempts.iter().map(|a| a.id).collect();

        let exams: HashMap<i64, Exam> = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {} FROM exams WHERE id = ANY($1)",
            EXAM_COLUMNS
        ))
        .bind(&exam_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

        let mut questions: HashMap<i64, Vec<Question>> = HashMap::new();
        for question in sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions WHERE exam_id = ANY($1) ORDER BY position, id",
            QUESTION_COLUMNS
        ))
        .bind(&exam_ids)
        .fetch_all(&self.pool)
        .await?
        {
            questions.entry(question.exam_id).or_default().push(question);
        }

        let mut responses: HashMap<i64, Vec<Response>> = HashMap::new();
        for response in sqlx::query_as::<_, Response>(&format!(
            "SELECT {} FROM responses WHERE attempt_id = ANY($1) ORDER BY id",
            RESPONSE_COLUMNS
        ))
        .bind(&attempt_ids)
        .fetch_all(&self.pool)
        .await?
        {
            responses.entry(response.attempt_id).or_default().push(response);
        }

        attempts
            .into_iter()
            .map(|attempt| -> Result<AttemptBundle, AppError> {
                let exam = exams.get(&attempt.exam_id).cloned().ok_or_else(|| {
                    AppError::InternalServerError(format!(
                        "Attempt {} references missing exam {}",
                        attempt.id, attempt.exam_id
                    ))
                })?;
                Ok(AttemptBundle {
                    questions: questions.get(&attempt.exam_id).cloned().unwrap_or_default(),
                    responses: responses.remove(&attempt.id).unwrap_or_default(),
                    exam,
                    attempt,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GradingStore for PgGradingStore {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {} FROM exams WHERE id = $1",
            EXAM_COLUMNS
        ))
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam)
    }

    async fn load_attempt(&self, attempt_id: i64) -> Result<Option<AttemptBundle>, AppError> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
            "SELECT {} FROM exam_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(attempt) = attempt else {
            return Ok(None);
        };

        Ok(self.assemble(vec![attempt]).await?.pop())
    }

    async fn list_attempts(
        &self,
        status: Option<AttemptGradingStatus>,
        limit: i64,
    ) -> Result<Vec<AttemptBundle>, AppError> {
        let statuses = match status {
            Some(status) => vec![status],
            None => vec![AttemptGradingStatus::Pending, AttemptGradingStatus::InProgress],
        };

        let attempts = sqlx::query_as::<_, ExamAttempt>(&format!(
            r#"
            SELECT {}
            FROM exam_attempts
            WHERE completed_at IS NOT NULL
              AND grading_status = ANY($1)
            ORDER BY completed_at ASC, id ASC
            LIMIT $2
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(&statuses)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(attempts).await
    }

    async fn create_attempt(
        &self,
        exam_id: i64,
        student_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<ExamAttempt, AppError> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
            r#"
            INSERT INTO exam_attempts (student_id, exam_id, started_at)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(student_id)
        .bind(exam_id)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn save_submission(&self, submission: &Submission) -> Result<Option<ExamAttempt>, AppError> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
            r#"
            UPDATE exam_attempts
            SET completed_at = $1, time_used = $2
            WHERE id = $3 AND completed_at IS NULL AND grading_status <> $4
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(submission.submitted_at)
        .bind(submission.time_used)
        .bind(submission.attempt_id)
        .bind(AttemptGradingStatus::Completed)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(attempt) = attempt else {
            return Ok(None);
        };

        for answer in &submission.answers {
            sqlx::query(
                r#"
                INSERT INTO responses (attempt_id, question_id, answer, is_correct, grading_status)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                    answer = EXCLUDED.answer,
                    is_correct = EXCLUDED.is_correct,
                    instructor_score = NULL,
                    instructor_feedback = NULL,
                    grading_status = EXCLUDED.grading_status,
                    graded_at = NULL,
                    graded_by = NULL
                "#,
            )
            .bind(submission.attempt_id)
            .bind(answer.question_id)
            .bind(Json(&answer.answer))
            .bind(answer.is_correct)
            .bind(ResponseGradingStatus::Pending)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(attempt))
    }

    async fn save_grade(&self, entry: &GradeEntry) -> Result<Response, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the attempt row so a concurrent finalization cannot slip in
        // between the check and the write.
        let row: Option<(AttemptGradingStatus, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT grading_status, completed_at FROM exam_attempts WHERE id = $1 FOR UPDATE",
        )
        .bind(entry.attempt_id)
        .fetch_optional(&mut *tx)
        .await?;

        match row {
            None => return Err(AppError::NotFound("Attempt not found".to_string())),
            Some((AttemptGradingStatus::Completed, _)) => {
                return Err(AppError::Conflict(format!(
                    "Attempt {} has already been finalized",
                    entry.attempt_id
                )));
            }
            Some((_, None)) => {
                return Err(AppError::Conflict(format!(
                    "Attempt {} has not been submitted yet",
                    entry.attempt_id
                )));
            }
            Some(_) => {}
        }

        let response = sqlx::query_as::<_, Response>(&format!(
            r#"
            INSERT INTO responses (
                attempt_id, question_id, instructor_score, instructor_feedback,
                grading_status, graded_at, graded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                instructor_score = EXCLUDED.instructor_score,
                instructor_feedback = EXCLUDED.instructor_feedback,
                grading_status = EXCLUDED.grading_status,
                graded_at = EXCLUDED.graded_at,
                graded_by = EXCLUDED.graded_by
            RETURNING {}
            "#,
            RESPONSE_COLUMNS
        ))
        .bind(entry.attempt_id)
        .bind(entry.question_id)
        .bind(entry.score)
        .bind(&entry.feedback)
        .bind(ResponseGradingStatus::Graded)
        .bind(entry.graded_at)
        .bind(entry.graded_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE exam_attempts
            SET grading_status = $1, graded_by = $2
            WHERE id = $3 AND grading_status = $4
            "#,
        )
        .bind(AttemptGradingStatus::InProgress)
        .bind(entry.graded_by)
        .bind(entry.attempt_id)
        .bind(AttemptGradingStatus::Pending)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(response)
    }

    async fn save_finalization(&self, outcome: &Finalization) -> Result<Option<ExamAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
            r#"
            UPDATE exam_attempts
            SET grading_status = $1,
                passed = $2,
                final_score = $3,
                instructor_feedback = $4,
                needs_review = $5,
                graded_by = $6,
                graded_at = $7
            WHERE id = $8 AND grading_status <> $1 AND completed_at IS NOT NULL
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(AttemptGradingStatus::Completed)
        .bind(outcome.passed)
        .bind(outcome.final_score)
        .bind(&outcome.instructor_feedback)
        .bind(outcome.needs_review)
        .bind(outcome.graded_by)
        .bind(outcome.graded_at)
        .bind(outcome.attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }
}
