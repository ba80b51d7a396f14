// src/handlers/attempts.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use super::grading::fetch_bundle;
use crate::{
    db::GradingStore,
    error::AppError,
    grading,
    models::attempt::{AttemptWithSummary, StartAttemptRequest, SubmitAttemptRequest},
};

/// Starts a new attempt at an exam for a student.
pub async fn start_attempt(
    State(store): State<Arc<dyn GradingStore>>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .find_exam(exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let attempt = store
        .create_attempt(exam_id, payload.student_id, chrono::Utc::now())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create attempt: {:?}", e);
            e
        })?;

    tracing::info!(
        attempt_id = attempt.id,
        exam_id,
        student_id = attempt.student_id,
        "Started exam attempt"
    );

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Submits a student's answers.
///
/// * Auto-grades multiple-choice and true/false answers.
/// * Leaves free-response answers pending for an instructor.
/// * An attempt can be submitted once.
pub async fn submit_attempt(
    State(store): State<Arc<dyn GradingStore>>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let bundle = fetch_bundle(store.as_ref(), attempt_id).await?;
    let submission = grading::grade_submission(
        &bundle,
        payload.answers,
        payload.time_used,
        chrono::Utc::now(),
    )?;

    let attempt = store
        .save_submission(&submission)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save submission for attempt {}: {:?}", attempt_id, e);
            e
        })?
        .ok_or_else(|| {
            AppError::Conflict(format!("Attempt {} has already been submitted", attempt_id))
        })?;

    tracing::info!(
        attempt_id,
        answered = submission.answers.len(),
        "Submitted exam attempt"
    );

    let bundle = fetch_bundle(store.as_ref(), attempt_id).await?;

    Ok(Json(AttemptWithSummary {
        summary: bundle.summary(),
        attempt,
    }))
}
