// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Weight applied to the multiple-choice sub-score when the exam leaves it unset.
pub const DEFAULT_MC_WEIGHT: f64 = 0.6;

/// Weight applied to the free-response sub-score when the exam leaves it unset.
pub const DEFAULT_FR_WEIGHT: f64 = 0.4;

/// Points a question is worth when its `points` column is null.
pub const DEFAULT_QUESTION_POINTS: f64 = 1.0;

pub const QUEUE_DEFAULT_LIMIT: i64 = 50;
pub const QUEUE_MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("PORT must be a valid port number: {}", e))?,
            Err(_) => 3000,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            database_url,
            rust_log,
            port,
            cors_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
