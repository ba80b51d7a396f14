// src/handlers/grading.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Serialize;
use validator::Validate;

use crate::{
    config::{QUEUE_DEFAULT_LIMIT, QUEUE_MAX_LIMIT},
    db::GradingStore,
    error::AppError,
    grading,
    models::{
        attempt::{
            AttemptBundle, AttemptDetail, AttemptWithSummary, CompleteGradingRequest, QueueEntry,
            QueueQuery,
        },
        response::{Response, UpdateScoreRequest},
    },
    scoring::ScoreSummary,
};

/// DTO returned after a grade is recorded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecorded {
    pub response: Response,
    pub summary: ScoreSummary,
}

pub(crate) async fn fetch_bundle(
    store: &dyn GradingStore,
    attempt_id: i64,
) -> Result<AttemptBundle, AppError> {
    store
        .load_attempt(attempt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
}

/// Returns an attempt with its questions, responses and freshly computed scores.
pub async fn get_attempt(
    State(store): State<Arc<dyn GradingStore>>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bundle = fetch_bundle(store.as_ref(), attempt_id).await?;
    Ok(Json(AttemptDetail::from(bundle)))
}

/// Lists submitted attempts awaiting grading, oldest first.
///
/// Without `status`, includes both `pending` and `in_progress` attempts.
pub async fn grading_queue(
    State(store): State<Arc<dyn GradingStore>>,
    Query(query): Query<QueueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(QUEUE_DEFAULT_LIMIT)
        .clamp(1, QUEUE_MAX_LIMIT);

    let bundles = store.list_attempts(query.status, limit).await.map_err(|e| {
        tracing::error!("Failed to load grading queue: {:?}", e);
        e
    })?;

    let entries: Vec<QueueEntry> = bundles.iter().map(QueueEntry::from).collect();
    Ok(Json(entries))
}

/// Records an instructor's score for one free-response question.
///
/// * Rejects the score before writing if it is missing or outside `[0, points]`.
/// * Overwrites any earlier grade for the same question.
/// * Returns the stored response and the recomputed summary.
pub async fn update_score(
    State(store): State<Arc<dyn GradingStore>>,
    Json(payload): Json<UpdateScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut bundle = fetch_bundle(store.as_ref(), payload.attempt_id).await?;
    let question = bundle
        .question(payload.question_id)
        .ok_or_else(|| AppError::NotFound("Question not found on this exam".to_string()))?;

    let entry = grading::record_grade(
        &bundle,
        question,
        payload.score,
        payload.feedback,
        payload.grader_id,
        chrono::Utc::now(),
    )?;

    let response = store.save_grade(&entry).await.map_err(|e| {
        if matches!(e, AppError::InternalServerError(_)) {
            tracing::error!("Failed to save grade: {:?}", e);
        }
        e
    })?;

    tracing::info!(
        attempt_id = entry.attempt_id,
        question_id = entry.question_id,
        score = entry.score,
        grader_id = entry.graded_by,
        "Recorded free-response grade"
    );

    bundle.upsert_response(response.clone());
    let summary = bundle.summary();

    Ok(Json(GradeRecorded { response, summary }))
}

/// Finalizes grading for an attempt.
///
/// Rejected with 409 while any free-response question is ungraded or when the
/// attempt is already completed; nothing is written in either case.
pub async fn complete_grading(
    State(store): State<Arc<dyn GradingStore>>,
    Json(payload): Json<CompleteGradingRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let bundle = fetch_bundle(store.as_ref(), payload.attempt_id).await?;
    let outcome = grading::finalize(
        &bundle,
        payload.instructor_feedback,
        payload.needs_review,
        payload.grader_id,
        chrono::Utc::now(),
    )?;

    let attempt = store
        .save_finalization(&outcome)
        .await
        .map_err(|e| {
            tracing::error!("Failed to finalize attempt {}: {:?}", outcome.attempt_id, e);
            e
        })?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "Attempt {} has already been finalized",
                outcome.attempt_id
            ))
        })?;

    tracing::info!(
        attempt_id = attempt.id,
        final_score = outcome.final_score,
        passed = outcome.passed,
        needs_review = outcome.needs_review,
        "Finalized exam attempt"
    );

    Ok(Json(AttemptWithSummary {
        summary: bundle.summary(),
        attempt,
    }))
}
