//! Ingestion decision pipeline.
//!
//! Sequential per-candidate flow: download, fingerprint, score, resolve,
//! then one batch insert for everything that survived. A failing candidate
//! is dropped with a warning and never affects its neighbors; the only fatal
//! outcome after the index is loaded is a failed batch write.

use reqwest::Client;
use sqlx::PgPool;

use crate::dedup::{self, KnownIndex};
use crate::domain::memes;
use crate::error::IngestError;
use crate::fingerprint::Fingerprinter;
use crate::models::{Candidate, DuplicateVerdict, Fingerprint, NewMeme};
use crate::safety::{self, SafetyScorer};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_FLAGGED: &str = "flagged";

/// Process candidates in input order and insert the survivors as one batch.
/// Returns the store-acknowledged insert count.
pub async fn run(
    client: &Client,
    candidates: Vec<Candidate>,
    index: &KnownIndex,
    scorer: Option<&dyn SafetyScorer>,
    review_threshold: f32,
    pool: &PgPool,
) -> Result<u64, IngestError> {
    let queued = collect_records(client, candidates, index, scorer, review_threshold).await;

    if queued.is_empty() {
        tracing::info!("no new memes to insert");
        return Ok(0);
    }

    memes::insert_batch(pool, &queued)
        .await
        .map_err(IngestError::BatchInsert)
}

/// The store-free half of the run: download, fingerprint, score, and resolve
/// every candidate, keeping input order. A candidate whose download fails is
/// dropped here; exact duplicates are discarded by the decision policy.
async fn collect_records(
    client: &Client,
    candidates: Vec<Candidate>,
    index: &KnownIndex,
    scorer: Option<&dyn SafetyScorer>,
    review_threshold: f32,
) -> Vec<NewMeme> {
    let fingerprinter = Fingerprinter::new();
    let mut queued: Vec<NewMeme> = Vec::new();
    let mut dropped = 0usize;
    let mut exact_duplicates = 0usize;

    for candidate in candidates {
        let Some(data) = download(client, &candidate.image_url).await else {
            dropped += 1;
            continue;
        };

        let fingerprint = Fingerprint {
            content_hash: fingerprinter.content_hash(&data),
            phash: fingerprinter.perceptual_hash(&data),
            nsfw_score: safety::score_or_default(scorer, &data),
        };

        let verdict = dedup::resolve(&fingerprint, index);
        match plan_record(candidate, fingerprint, verdict, review_threshold) {
            Some(record) => {
                if let Some(id) = record.duplicate_of {
                    tracing::info!(
                        image_url = %record.image_url,
                        duplicate_of = %id,
                        "near-duplicate kept with lineage"
                    );
                }
                queued.push(record);
            }
            None => {
                exact_duplicates += 1;
            }
        }
    }

    tracing::info!(
        queued = queued.len(),
        dropped,
        exact_duplicates,
        "candidate processing complete"
    );

    queued
}

/// Decision policy for one resolved candidate.
///
/// Exact duplicates carry no new information and are discarded. Unique and
/// near-duplicate candidates are queued; near duplicates keep the matched id
/// as `duplicate_of` lineage. The safety score routes between the pending
/// and review statuses but never suppresses a record.
fn plan_record(
    candidate: Candidate,
    fingerprint: Fingerprint,
    verdict: DuplicateVerdict,
    review_threshold: f32,
) -> Option<NewMeme> {
    if let DuplicateVerdict::ExactDuplicate(id) = verdict {
        tracing::debug!(image_url = %candidate.image_url, duplicate_of = %id, "exact duplicate, skipping");
        return None;
    }

    Some(NewMeme {
        title: candidate.title,
        image_url: candidate.image_url,
        source_url: candidate.source_url,
        author: candidate.author,
        score: candidate.score,
        content_hash: fingerprint.content_hash,
        phash: fingerprint.phash,
        nsfw_score: fingerprint.nsfw_score,
        duplicate_of: verdict.matched_id(),
        status: status_for(fingerprint.nsfw_score, review_threshold),
    })
}

fn status_for(nsfw_score: f32, review_threshold: f32) -> &'static str {
    if nsfw_score >= review_threshold {
        STATUS_FLAGGED
    } else {
        STATUS_PENDING
    }
}

async fn download(client: &Client, url: &str) -> Option<Vec<u8>> {
    let result = async {
        let resp = client.get(url).send().await?.error_for_status()?;
        resp.bytes().await
    }
    .await;

    match result {
        Ok(data) => Some(data.to_vec()),
        Err(e) => {
            tracing::warn!(url, error = %e, "failed to download image, dropping candidate");
            None
        }
    }
}
