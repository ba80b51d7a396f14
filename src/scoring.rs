// src/scoring.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    config::{DEFAULT_FR_WEIGHT, DEFAULT_MC_WEIGHT},
    models::{
        question::{Question, ScoringCategory},
        response::Response,
    },
};

/// Multipliers applied to the two sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub multiple_choice: f64,
    pub free_response: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            multiple_choice: DEFAULT_MC_WEIGHT,
            free_response: DEFAULT_FR_WEIGHT,
        }
    }
}

impl ScoreWeights {
    /// Each weight falls back to its own default when the exam leaves it null.
    pub fn from_exam(multiple_choice: Option<f64>, free_response: Option<f64>) -> Self {
        Self {
            multiple_choice: multiple_choice.unwrap_or(DEFAULT_MC_WEIGHT),
            free_response: free_response.unwrap_or(DEFAULT_FR_WEIGHT),
        }
    }
}

/// Scores derived from one attempt. Never stored as a whole; recomputed on
/// every read and after every grade write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub mc_correct: usize,
    pub mc_total: usize,
    pub mc_score: f64,

    pub fr_earned: f64,
    pub fr_possible: f64,
    pub fr_score: f64,

    pub fr_graded: usize,
    pub fr_total: usize,
    /// Free-response questions with no graded response yet, in exam order.
    pub ungraded_question_ids: Vec<i64>,

    pub weights: ScoreWeights,
    pub final_score: f64,
    pub grading_progress: f64,
    pub can_finalize: bool,
    pub passed: bool,
}

/// Computes the sub-scores, the weighted final score and grading progress.
///
/// * A category with no questions scores 0 and still takes part in the
///   weighted sum.
/// * The final score is `mc * mc_weight + fr * fr_weight`. It is not divided
///   by the weight total, so weights that do not sum to 1 give a value that
///   is not a true percentage.
/// * Responses whose question is not in `questions` are ignored.
pub fn summarize(
    questions: &[Question],
    responses: &[Response],
    weights: ScoreWeights,
    passing_score: f64,
) -> ScoreSummary {
    let by_question: HashMap<i64, &Response> =
        responses.iter().map(|r| (r.question_id, r)).collect();

    let mut mc_correct = 0;
    let mut mc_total = 0;
    let mut fr_earned = 0.0;
    let mut fr_possible = 0.0;
    let mut fr_graded = 0;
    let mut fr_total = 0;
    let mut ungraded_question_ids = Vec::new();

    for question in questions {
        let response = by_question.get(&question.id);
        match question.category() {
            ScoringCategory::MultipleChoice => {
                mc_total += 1;
                if response.and_then(|r| r.is_correct) == Some(true) {
                    mc_correct += 1;
                }
            }
            ScoringCategory::FreeResponse => {
                fr_total += 1;
                fr_possible += question.max_points();
                fr_earned += response.and_then(|r| r.instructor_score).unwrap_or(0.0);
                if response.is_some_and(|r| r.is_graded()) {
                    fr_graded += 1;
                } else {
                    ungraded_question_ids.push(question.id);
                }
            }
        }
    }

    let mc_score = percentage(mc_correct as f64, mc_total as f64);
    let fr_score = percentage(fr_earned, fr_possible);
    let final_score = mc_score * weights.multiple_choice + fr_score * weights.free_response;

    let grading_progress = if fr_total == 0 {
        100.0
    } else {
        fr_graded as f64 * 100.0 / fr_total as f64
    };
    let can_finalize = fr_graded == fr_total;

    ScoreSummary {
        mc_correct,
        mc_total,
        mc_score,
        fr_earned,
        fr_possible,
        fr_score,
        fr_graded,
        fr_total,
        ungraded_question_ids,
        weights,
        final_score,
        grading_progress,
        can_finalize,
        passed: final_score >= passing_score,
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    part * 100.0 / whole
}
