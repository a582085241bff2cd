//! Fatal run-level errors.
//!
//! Per-item failures (download, decode, classify) never show up here; they
//! are logged and degraded at the boundary where they occur. These variants
//! abort the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to load known-item index: {0}")]
    IndexLoad(#[source] sqlx::Error),

    #[error("batch insert failed: {0}")]
    BatchInsert(#[source] sqlx::Error),
}
