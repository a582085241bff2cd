//! Safety scoring for candidate images.
//!
//! Measurement is decoupled from policy: every candidate gets a score in
//! [0,1] recorded on its row, and the pipeline decides routing separately.
//! The scorer is an expensive-to-build resource constructed once at startup
//! and shared across all calls; its absence is an `Option`, not an error,
//! and means every candidate scores 0.0.

use anyhow::Result;
use std::sync::Arc;

mod nsfw;

pub use nsfw::NsfwScorer;

pub trait SafetyScorer: Send + Sync {
    /// Probability that the image is explicit/sexualized content.
    fn score(&self, data: &[u8]) -> Result<f32>;
}

/// Build the model-backed scorer, degrading to None if the model cannot be
/// loaded. A missing classifier must never block ingestion.
pub fn load_scorer() -> Option<Arc<dyn SafetyScorer>> {
    match NsfwScorer::new() {
        Ok(scorer) => Some(Arc::new(scorer)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load NSFW model, scoring disabled");
            None
        }
    }
}

/// Score one image, treating both an absent scorer and a scorer failure as
/// 0.0 (unscored / assume safe). Failures are logged, never propagated.
pub fn score_or_default(scorer: Option<&dyn SafetyScorer>, data: &[u8]) -> f32 {
    let Some(scorer) = scorer else {
        return 0.0;
    };
    match scorer.score(data) {
        Ok(score) => score.clamp(0.0, 1.0),
        Err(e) => {
            tracing::warn!(error = %e, "NSFW scoring failed, treating as safe");
            0.0
        }
    }
}
