// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_grading::{
    config::Config,
    db::GradingStore,
    error::AppError,
    grading::{Finalization, GradeEntry, Submission},
    models::{
        attempt::{AttemptBundle, AttemptGradingStatus, ExamAttempt},
        exam::Exam,
        question::{Answer, Question, QuestionKind},
        response::{Response, ResponseGradingStatus},
    },
    routes,
    state::AppState,
};
use sqlx::types::Json;

#[derive(Default)]
struct Tables {
    next_id: i64,
    exams: Vec<Exam>,
    questions: Vec<Question>,
    attempts: Vec<ExamAttempt>,
    responses: Vec<Response>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn bundle(&self, attempt: &ExamAttempt) -> Option<AttemptBundle> {
        let exam = self.exams.iter().find(|e| e.id == attempt.exam_id)?.clone();
        let mut questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| q.exam_id == exam.id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.position, q.id));
        let responses = self
            .responses
            .iter()
            .filter(|r| r.attempt_id == attempt.id)
            .cloned()
            .collect();

        Some(AttemptBundle {
            attempt: attempt.clone(),
            exam,
            questions,
            responses,
        })
    }
}

/// In-memory `GradingStore` with the same write rules as the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn add_exam(&self, passing_score: f64, mc_weight: Option<f64>, fr_weight: Option<f64>) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        t.exams.push(Exam {
            id,
            unit_id: 1,
            title: format!("Unit Exam {}", id),
            passing_score,
            multiple_choice_weight: mc_weight,
            free_response_weight: fr_weight,
            time_limit: Some(60),
        });
        id
    }

    pub fn add_question(&self, exam_id: i64, points: Option<f64>, kind: QuestionKind) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        let position = t.questions.iter().filter(|q| q.exam_id == exam_id).count() as i32;
        t.questions.push(Question {
            id,
            exam_id,
            position,
            prompt: format!("Question {}", id),
            points,
            kind: Json(kind),
        });
        id
    }

    pub fn add_mc_question(&self, exam_id: i64) -> i64 {
        self.add_question(
            exam_id,
            None,
            QuestionKind::MultipleChoice {
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_index: 0,
            },
        )
    }

    pub fn add_fr_question(&self, exam_id: i64, points: f64) -> i64 {
        self.add_question(
            exam_id,
            Some(points),
            QuestionKind::FreeResponse {
                rubric: Some("Thesis, evidence, reasoning".into()),
            },
        )
    }

    /// Adds an attempt. Submitted attempts get `completed_at` set.
    pub fn add_attempt(&self, exam_id: i64, student_id: i64, submitted: bool) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        let now = Utc::now();
        t.attempts.push(ExamAttempt {
            id,
            student_id,
            exam_id,
            started_at: now,
            completed_at: submitted.then_some(now),
            time_used: submitted.then_some(900),
            grading_status: AttemptGradingStatus::Pending,
            passed: false,
            final_score: None,
            instructor_feedback: None,
            needs_review: false,
            graded_by: None,
            graded_at: None,
        });
        id
    }

    pub fn add_mc_response(&self, attempt_id: i64, question_id: i64, correct: bool) {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        t.responses.push(Response {
            id,
            attempt_id,
            question_id,
            answer: Some(Json(Answer::Choice {
                selected: if correct { 0 } else { 1 },
            })),
            is_correct: Some(correct),
            instructor_score: None,
            instructor_feedback: None,
            grading_status: ResponseGradingStatus::Pending,
            graded_at: None,
            graded_by: None,
        });
    }

    pub fn add_fr_response(&self, attempt_id: i64, question_id: i64) {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        t.responses.push(Response {
            id,
            attempt_id,
            question_id,
            answer: Some(Json(Answer::Text {
                text: "The policy expanded federal power.".into(),
            })),
            is_correct: None,
            instructor_score: None,
            instructor_feedback: None,
            grading_status: ResponseGradingStatus::Pending,
            graded_at: None,
            graded_by: None,
        });
    }

    pub fn attempt(&self, attempt_id: i64) -> ExamAttempt {
        let t = self.tables.lock().unwrap();
        t.attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned()
            .expect("attempt exists")
    }
}

#[async_trait]
impl GradingStore for MemoryStore {
    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.exams.iter().find(|e| e.id == exam_id).cloned())
    }

    async fn load_attempt(&self, attempt_id: i64) -> Result<Option<AttemptBundle>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t
            .attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .and_then(|a| t.bundle(a)))
    }

    async fn list_attempts(
        &self,
        status: Option<AttemptGradingStatus>,
        limit: i64,
    ) -> Result<Vec<AttemptBundle>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut attempts: Vec<&ExamAttempt> = t
            .attempts
            .iter()
            .filter(|a| a.completed_at.is_some())
            .filter(|a| match status {
                Some(status) => a.grading_status == status,
                None => a.grading_status != AttemptGradingStatus::Completed,
            })
            .collect();
        attempts.sort_by_key(|a| (a.completed_at, a.id));

        Ok(attempts
            .into_iter()
            .take(limit as usize)
            .filter_map(|a| t.bundle(a))
            .collect())
    }

    async fn create_attempt(
        &self,
        exam_id: i64,
        student_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<ExamAttempt, AppError> {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        let attempt = ExamAttempt {
            id,
            student_id,
            exam_id,
            started_at,
            completed_at: None,
            time_used: None,
            grading_status: AttemptGradingStatus::Pending,
            passed: false,
            final_score: None,
            instructor_feedback: None,
            needs_review: false,
            graded_by: None,
            graded_at: None,
        };
        t.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn save_submission(&self, submission: &Submission) -> Result<Option<ExamAttempt>, AppError> {
        let mut t = self.tables.lock().unwrap();
        let Some(attempt) = t.attempts.iter_mut().find(|a| {
            a.id == submission.attempt_id
                && a.completed_at.is_none()
                && a.grading_status != AttemptGradingStatus::Completed
        }) else {
            return Ok(None);
        };
        attempt.completed_at = Some(submission.submitted_at);
        attempt.time_used = submission.time_used;
        let attempt = attempt.clone();

        for answer in &submission.answers {
            let existing = t.responses.iter().position(|r| {
                r.attempt_id == submission.attempt_id && r.question_id == answer.question_id
            });
            let id = match existing {
                Some(index) => t.responses[index].id,
                None => t.id(),
            };
            let response = Response {
                id,
                attempt_id: submission.attempt_id,
                question_id: answer.question_id,
                answer: Some(Json(answer.answer.clone())),
                is_correct: answer.is_correct,
                instructor_score: None,
                instructor_feedback: None,
                grading_status: ResponseGradingStatus::Pending,
                graded_at: None,
                graded_by: None,
            };
            // Same row the ON CONFLICT upsert would update.
            match existing {
                Some(index) => t.responses[index] = response,
                None => t.responses.push(response),
            }
        }
        Ok(Some(attempt))
    }

    async fn save_grade(&self, entry: &GradeEntry) -> Result<Response, AppError> {
        let mut t = self.tables.lock().unwrap();
        let attempt = t
            .attempts
            .iter_mut()
            .find(|a| a.id == entry.attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        if attempt.completed_at.is_none() {
            return Err(AppError::Conflict("Attempt has not been submitted yet".to_string()));
        }
        match attempt.grading_status {
            AttemptGradingStatus::Completed => {
                return Err(AppError::Conflict("Attempt has already been finalized".to_string()));
            }
            AttemptGradingStatus::Pending => {
                attempt.grading_status = AttemptGradingStatus::InProgress;
                attempt.graded_by = Some(entry.graded_by);
            }
            AttemptGradingStatus::InProgress => {}
        }

        let existing = t
            .responses
            .iter()
            .position(|r| r.attempt_id == entry.attempt_id && r.question_id == entry.question_id);
        let index = match existing {
            Some(index) => index,
            None => {
                let id = t.id();
                t.responses.push(Response {
                    id,
                    attempt_id: entry.attempt_id,
                    question_id: entry.question_id,
                    answer: None,
                    is_correct: None,
                    instructor_score: None,
                    instructor_feedback: None,
                    grading_status: ResponseGradingStatus::Pending,
                    graded_at: None,
                    graded_by: None,
                });
                t.responses.len() - 1
            }
        };

        let response = &mut t.responses[index];
        response.instructor_score = Some(entry.score);
        response.instructor_feedback = entry.feedback.clone();
        response.grading_status = ResponseGradingStatus::Graded;
        response.graded_at = Some(entry.graded_at);
        response.graded_by = Some(entry.graded_by);
        Ok(response.clone())
    }

    async fn save_finalization(&self, outcome: &Finalization) -> Result<Option<ExamAttempt>, AppError> {
        let mut t = self.tables.lock().unwrap();
        let Some(attempt) = t.attempts.iter_mut().find(|a| {
            a.id == outcome.attempt_id
                && a.completed_at.is_some()
                && a.grading_status != AttemptGradingStatus::Completed
        }) else {
            return Ok(None);
        };
        attempt.grading_status = AttemptGradingStatus::Completed;
        attempt.passed = outcome.passed;
        attempt.final_score = Some(outcome.final_score);
        attempt.instructor_feedback = outcome.instructor_feedback.clone();
        attempt.needs_review = outcome.needs_review;
        attempt.graded_by = outcome.graded_by;
        attempt.graded_at = Some(outcome.graded_at);
        Ok(Some(attempt.clone()))
    }
}

/// Spawns the app on a random port backed by `store`.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app(store: Arc<MemoryStore>) -> String {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        rust_log: "error".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
    };

    let state = AppState { store, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// The worked example: 10 MC questions (6 answered correctly) and two 5-point
/// FR questions, both still pending.
pub struct SampleAttempt {
    pub exam_id: i64,
    pub attempt_id: i64,
    pub mc_ids: Vec<i64>,
    pub fr_ids: Vec<i64>,
}

pub fn seed_sample_attempt(store: &MemoryStore, passing_score: f64) -> SampleAttempt {
    let exam_id = store.add_exam(passing_score, None, None);
    let mc_ids: Vec<i64> = (0..10).map(|_| store.add_mc_question(exam_id)).collect();
    let fr_ids: Vec<i64> = (0..2).map(|_| store.add_fr_question(exam_id, 5.0)).collect();

    let attempt_id = store.add_attempt(exam_id, 42, true);
    for (i, id) in mc_ids.iter().enumerate() {
        store.add_mc_response(attempt_id, *id, i < 6);
    }
    for id in &fr_ids {
        store.add_fr_response(attempt_id, *id);
    }

    SampleAttempt {
        exam_id,
        attempt_id,
        mc_ids,
        fr_ids,
    }
}
