//! Shared data models used across modules

use uuid::Uuid;

/// A meme proposed by the feed source, not yet downloaded or judged.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub image_url: String,
    pub source_url: String,
    pub author: Option<String>,
    pub score: i64,
}

/// Identity derived from one candidate's raw image bytes.
///
/// `content_hash` is always present; `phash` is absent when the bytes do not
/// decode as an image.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    /// SHA-256 over the raw bytes, lowercase hex (64 chars)
    pub content_hash: String,
    /// Hex-encoded 64-bit DCT perceptual hash (16 chars)
    pub phash: Option<String>,
    /// Probability of explicit content, 0.0 when unscored
    pub nsfw_score: f32,
}

/// Minimal projection of a persisted meme, sufficient for duplicate checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KnownItem {
    pub id: Uuid,
    pub content_hash: Option<String>,
    pub phash: Option<String>,
}

/// Resolver output for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateVerdict {
    Unique,
    ExactDuplicate(Uuid),
    NearDuplicate(Uuid),
}

impl DuplicateVerdict {
    /// The matched item, if any. Exact and near duplicates both carry lineage.
    pub fn matched_id(&self) -> Option<Uuid> {
        match self {
            DuplicateVerdict::Unique => None,
            DuplicateVerdict::ExactDuplicate(id) | DuplicateVerdict::NearDuplicate(id) => Some(*id),
        }
    }
}

/// A row queued for the final batch insert.
#[derive(Debug, Clone)]
pub struct NewMeme {
    pub title: String,
    pub image_url: String,
    pub source_url: String,
    pub author: Option<String>,
    pub score: i64,
    pub content_hash: String,
    pub phash: Option<String>,
    pub nsfw_score: f32,
    pub duplicate_of: Option<Uuid>,
    pub status: &'static str,
}
