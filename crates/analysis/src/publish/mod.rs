//! Atomic result publication
//!
//! A result must never be observed partially written: the in-memory
//! snapshot is replaced through a single pointer swap, and the optional
//! file mirror is written to a temporary path and renamed into place.
//! Every publication carries a monotonically increasing sequence number
//! and a SHA-256 content digest, so pollers detect completion without
//! whole-content byte comparison and distinct-but-identical outputs are
//! still distinguishable.

use crate::orchestrator::AnalysisOutcome;
use chrono::{DateTime, Utc};
use lexforge_common::errors::{AppError, Result};
use lexforge_common::metrics;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A published snapshot: the outcome document plus freshness metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedResult {
    /// Monotonically increasing publication counter
    pub seq: u64,

    /// Hex SHA-256 of the serialized outcome document
    pub digest: String,

    /// Publication time
    pub completed_at: DateTime<Utc>,

    /// The outcome document itself
    #[serde(flatten)]
    pub document: AnalysisOutcome,
}

/// Publisher with single-visible-write semantics
pub struct Publisher {
    seq: AtomicU64,
    current: RwLock<Option<Arc<PublishedResult>>>,
    output_path: Option<PathBuf>,
}

impl Publisher {
    /// Create a publisher; when a path is given, each snapshot is also
    /// mirrored to disk through a temp-file rename
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self {
            seq: AtomicU64::new(0),
            current: RwLock::new(None),
            output_path,
        }
    }

    /// The sequence number of the latest publication (0 before any)
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Publish an outcome atomically, returning its sequence number
    pub async fn publish(&self, outcome: &AnalysisOutcome) -> Result<u64> {
        let document_bytes = serde_json::to_vec(outcome)?;
        let digest = hex::encode(Sha256::digest(&document_bytes));

        // The lock serializes writers, so fetch_add under it keeps seq
        // and the visible snapshot in lockstep
        let mut current = self.current.write().await;
        let seq = self.seq.fetch_add(1, Ordering::AcqRel) + 1;

        let result = Arc::new(PublishedResult {
            seq,
            digest,
            completed_at: Utc::now(),
            document: outcome.clone(),
        });

        if let Some(path) = &self.output_path {
            write_atomically(path, &result).await?;
        }

        *current = Some(Arc::clone(&result));
        drop(current);

        metrics::record_publish(outcome.status.label());
        tracing::info!(seq, "Result published");
        Ok(seq)
    }

    /// The latest published snapshot, if any
    pub async fn snapshot(&self) -> Option<Arc<PublishedResult>> {
        self.current.read().await.clone()
    }
}

/// Write to `<path>.tmp`, then rename into place. Rename within one
/// directory is a single visible write on POSIX filesystems.
async fn write_atomically(path: &Path, result: &PublishedResult) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(result)?;

    let mut tmp_path = path.to_path_buf();
    tmp_path.set_extension("tmp");

    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| AppError::PublishError {
            message: format!("write {}: {}", tmp_path.display(), e),
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| AppError::PublishError {
            message: format!("rename into {}: {}", path.display(), e),
        })?;

    Ok(())
}
