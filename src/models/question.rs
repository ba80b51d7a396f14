// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::config::DEFAULT_QUESTION_POINTS;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub exam_id: i64,

    /// Display order within the exam.
    pub position: i32,

    pub prompt: String,

    /// Maximum score. Null means the default of one point.
    pub points: Option<f64>,

    /// Type-specific payload, stored as JSONB.
    pub kind: Json<QuestionKind>,
}

impl Question {
    pub fn max_points(&self) -> f64 {
        self.points.unwrap_or(DEFAULT_QUESTION_POINTS)
    }

    pub fn category(&self) -> ScoringCategory {
        self.kind.category()
    }

    pub fn is_free_response(&self) -> bool {
        self.category() == ScoringCategory::FreeResponse
    }
}

/// Question payload. Resolved once at the database boundary instead of
/// inspecting the JSON shape at every use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    TrueFalse {
        correct: bool,
    },
    FreeResponse {
        rubric: Option<String>,
    },
}

/// Which sub-score a question contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringCategory {
    MultipleChoice,
    FreeResponse,
}

impl QuestionKind {
    pub fn category(&self) -> ScoringCategory {
        match self {
            QuestionKind::MultipleChoice { .. } | QuestionKind::TrueFalse { .. } => {
                ScoringCategory::MultipleChoice
            }
            QuestionKind::FreeResponse { .. } => ScoringCategory::FreeResponse,
        }
    }

    /// Auto-grades an answer.
    ///
    /// Returns `None` for free-response questions, which need an instructor.
    /// An answer of the wrong shape for the question counts as incorrect.
    pub fn check(&self, answer: &Answer) -> Option<bool> {
        match (self, answer) {
            (QuestionKind::FreeResponse { .. }, _) => None,
            (QuestionKind::MultipleChoice { correct_index, .. }, Answer::Choice { selected }) => {
                Some(selected == correct_index)
            }
            (QuestionKind::TrueFalse { correct }, Answer::Boolean { value }) => {
                Some(value == correct)
            }
            _ => Some(false),
        }
    }
}

/// A student's answer payload, stored as JSONB on the response row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Choice { selected: usize },
    Boolean { value: bool },
    Text { text: String },
}
