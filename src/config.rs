//! Environment-variable configuration.
//!
//! Everything the run needs is read once at startup. `DATABASE_URL` is the
//! only required variable; a missing value there is fatal before any network
//! traffic happens.

use anyhow::{Context, Result};
use std::env;

const DEFAULT_USER_AGENT: &str = "meme-ingest/0.1 (+https://plentyofmemes.example)";
const DEFAULT_SUBREDDITS: &str = "memes,dankmemes,funny,wholesomememes,AdviceAnimals";
const DEFAULT_FETCH_LIMIT: u32 = 25;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_NSFW_REVIEW_THRESHOLD: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub user_agent: String,
    pub subreddits: Vec<String>,
    pub fetch_limit: u32,
    pub http_timeout_secs: u64,
    /// Queued records scoring at or above this go to the review queue
    /// (`status = "flagged"`) instead of `"pending"`. Nothing is dropped by
    /// score.
    pub nsfw_review_threshold: f32,
    /// When false, the classifier model is never loaded and every candidate
    /// scores 0.0.
    pub nsfw_detection: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let user_agent = env::var("REDDIT_USER_AGENT")
            .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let subreddits = parse_subreddits(
            &env::var("SUBREDDITS").unwrap_or_else(|_| DEFAULT_SUBREDDITS.to_string()),
        );

        let fetch_limit = env::var("FETCH_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_FETCH_LIMIT);

        let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        let nsfw_review_threshold = env::var("NSFW_REVIEW_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v: &f32| (0.0..=1.0).contains(v))
            .unwrap_or(DEFAULT_NSFW_REVIEW_THRESHOLD);

        let nsfw_detection = env::var("NSFW_DETECTION")
            .map(|v| v != "off" && v != "0" && v != "false")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            user_agent,
            subreddits,
            fetch_limit,
            http_timeout_secs,
            nsfw_review_threshold,
            nsfw_detection,
        })
    }
}

fn parse_subreddits(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
