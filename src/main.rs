//! Fetches the day's top memes from a set of subreddits, fingerprints and
//! scores each image, reconciles it against the already-ingested memes, and
//! queues the survivors in Postgres. Exact duplicates are discarded, near
//! duplicates are kept with lineage, and high NSFW scores route to a review
//! queue instead of the pending feed.

mod config;
mod dedup;
mod domain;
mod error;
mod feed;
mod fingerprint;
mod models;
mod pipeline;
mod safety;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use config::Config;
use dedup::KnownIndex;
use models::Candidate;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meme_ingest=info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    // Snapshot the known-item universe before touching the feed. Without it
    // every candidate would look unique, so failure aborts the run.
    let index = KnownIndex::load(&pool).await?;
    tracing::info!(known_items = index.item_count(), "known-item index loaded");

    // One expensive model load, shared across all scoring calls. A failed
    // load degrades to unscored, not to an aborted run.
    let scorer = if config.nsfw_detection {
        safety::load_scorer()
    } else {
        tracing::info!("NSFW detection disabled by configuration");
        None
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    for subreddit in &config.subreddits {
        tracing::info!(subreddit = %subreddit, "fetching top posts");
        let posts = feed::fetch_top(&client, subreddit, config.fetch_limit).await;
        tracing::info!(subreddit = %subreddit, count = posts.len(), "retrieved candidates");
        candidates.extend(posts);
    }

    if candidates.is_empty() {
        tracing::info!("no candidates found");
        return Ok(());
    }

    tracing::info!(total = candidates.len(), "processing candidates");
    let inserted = pipeline::run(
        &client,
        candidates,
        &index,
        scorer.as_deref(),
        config.nsfw_review_threshold,
        &pool,
    )
    .await?;

    tracing::info!(inserted, "run complete");
    Ok(())
}
