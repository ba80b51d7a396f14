// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::scoring::ScoreWeights;

/// Represents the 'exams' table: one unit exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub unit_id: i64,
    pub title: String,

    /// Threshold percentage for `passed`.
    pub passing_score: f64,

    pub multiple_choice_weight: Option<f64>,
    pub free_response_weight: Option<f64>,

    /// Time limit in minutes, if any.
    pub time_limit: Option<i32>,
}

impl Exam {
    pub fn weights(&self) -> ScoreWeights {
        ScoreWeights::from_exam(self.multiple_choice_weight, self.free_response_weight)
    }
}
