// src/grading.rs

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};

use crate::models::{
    attempt::AttemptBundle,
    question::{Answer, Question},
};

/// A rule violation in a grading action. Raised before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingError {
    ScoreMissing,
    ScoreOutOfRange { score: f64, max: f64 },
    NotFreeResponse { question_id: i64 },
    AttemptFinalized { attempt_id: i64 },
    NotSubmitted { attempt_id: i64 },
    GradingIncomplete { remaining: usize },
    AlreadySubmitted { attempt_id: i64 },
    UnknownQuestion { question_id: i64 },
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::ScoreMissing => write!(f, "A score is required"),
            GradingError::ScoreOutOfRange { score, max } => {
                write!(f, "Score {} must be between 0 and {}", score, max)
            }
            GradingError::NotFreeResponse { question_id } => write!(
                f,
                "Question {} is auto-graded and cannot be scored manually",
                question_id
            ),
            GradingError::AttemptFinalized { attempt_id } => {
                write!(f, "Attempt {} has already been finalized", attempt_id)
            }
            GradingError::NotSubmitted { attempt_id } => {
                write!(f, "Attempt {} has not been submitted yet", attempt_id)
            }
            GradingError::GradingIncomplete { remaining } => write!(
                f,
                "{} free-response question(s) still need a grade",
                remaining
            ),
            GradingError::AlreadySubmitted { attempt_id } => {
                write!(f, "Attempt {} has already been submitted", attempt_id)
            }
            GradingError::UnknownQuestion { question_id } => {
                write!(f, "Question {} is not part of this exam", question_id)
            }
        }
    }
}

impl std::error::Error for GradingError {}

/// A validated instructor grade for one free-response question.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEntry {
    pub attempt_id: i64,
    pub question_id: i64,
    pub score: f64,
    pub feedback: Option<String>,
    pub graded_by: i64,
    pub graded_at: DateTime<Utc>,
}

/// Validates an instructor's score for `question` within the attempt.
///
/// Only submitted, not yet finalized attempts can be graded. Re-grading an already graded response is allowed and overwrites it.
pub fn record_grade(
    bundle: &AttemptBundle,
    question: &Question,
    score: Option<f64>,
    feedback: Option<String>,
    grader_id: i64,
    now: DateTime<Utc>,
) -> Result<GradeEntry, GradingError> {
    if bundle.attempt.is_finalized() {
        return Err(GradingError::AttemptFinalized {
            attempt_id: bundle.attempt.id,
        });
    }
    if !bundle.attempt.is_submitted() {
        return Err(GradingError::NotSubmitted {
            attempt_id: bundle.attempt.id,
        });
    }

    if !question.is_free_response() {
        return Err(GradingError::NotFreeResponse {
            question_id: question.id,
        });
    }

    let score = score.ok_or(GradingError::ScoreMissing)?;
    let max = question.max_points();
    if !score.is_finite() || score < 0.0 || score > max {
        return Err(GradingError::ScoreOutOfRange { score, max });
    }

    Ok(GradeEntry {
        attempt_id: bundle.attempt.id,
        question_id: question.id,
        score,
        feedback: feedback.filter(|f| !f.trim().is_empty()),
        graded_by: grader_id,
        graded_at: now,
    })
}

/// The attempt-level outcome written when an instructor finalizes grading.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalization {
    pub attempt_id: i64,
    pub final_score: f64,
    pub passed: bool,
    pub instructor_feedback: Option<String>,
    pub needs_review: bool,
    pub graded_by: Option<i64>,
    pub graded_at: DateTime<Utc>,
}

/// Checks that every free-response question is graded and computes the
/// stored outcome.
pub fn finalize(
    bundle: &AttemptBundle,
    instructor_feedback: Option<String>,
    needs_review: bool,
    grader_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Finalization, GradingError> {
    if bundle.attempt.is_finalized() {
        return Err(GradingError::AttemptFinalized {
            attempt_id: bundle.attempt.id,
        });
    }
    if !bundle.attempt.is_submitted() {
        return Err(GradingError::NotSubmitted {
            attempt_id: bundle.attempt.id,
        });
    }

    let summary = bundle.summary();
    if !summary.can_finalize {
        return Err(GradingError::GradingIncomplete {
            remaining: summary.ungraded_question_ids.len(),
        });
    }

    Ok(Finalization {
        attempt_id: bundle.attempt.id,
        final_score: summary.final_score,
        passed: summary.passed,
        instructor_feedback: instructor_feedback.filter(|f| !f.trim().is_empty()),
        needs_review,
        graded_by: grader_id.or(bundle.attempt.graded_by),
        graded_at: now,
    })
}

/// One answer ready to be stored, with its auto-graded result.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub answer: Answer,
    pub is_correct: Option<bool>,
}

/// A student's whole submission for an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub attempt_id: i64,
    pub time_used: Option<i32>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<SubmittedAnswer>,
}

/// Auto-grades a student's answers against the exam's answer keys.
///
/// Multiple-choice and true/false answers get `is_correct`; free-response
/// answers are left for an instructor. Questions the student skipped get no
/// response row.
pub fn grade_submission(
    bundle: &AttemptBundle,
    answers: HashMap<i64, Answer>,
    time_used: Option<i32>,
    now: DateTime<Utc>,
) -> Result<Submission, GradingError> {
    if bundle.attempt.is_finalized() {
        return Err(GradingError::AttemptFinalized {
            attempt_id: bundle.attempt.id,
        });
    }

    if bundle.attempt.is_submitted() {
        return Err(GradingError::AlreadySubmitted {
            attempt_id: bundle.attempt.id,
        });
    }

    let mut graded = Vec::with_capacity(answers.len());
    for (question_id, answer) in answers {
        let question = bundle
            .question(question_id)
            .ok_or(GradingError::UnknownQuestion { question_id })?;
        graded.push(SubmittedAnswer {
            question_id,
            is_correct: question.kind.check(&answer),
            answer,
        });
    }
    graded.sort_by_key(|a| a.question_id);

    Ok(Submission {
        attempt_id: bundle.attempt.id,
        time_used,
        submitted_at: now,
        answers: graded,
    })
}
