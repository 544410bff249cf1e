//! Event type definitions for progress reporting.

use crate::core::organize::{BatchSummary, MoveOutcome};
use serde::{Deserialize, Serialize};

/// All events emitted by the archiver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Ingestion (hashing + classification) events
    Ingest(IngestEvent),
    /// Relocation batch events
    Relocate(RelocateEvent),
}

/// Events while files are added to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IngestEvent {
    /// A file joined the working set
    Added { filename: String },
    /// A file was already in the working set (same quick identity)
    AlreadySeen { filename: String },
    /// A file was refused (security, identity or unsupported type)
    Rejected { filename: String, reason: String },
}

/// Events during a relocation batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelocateEvent {
    /// The batch passed archive-root validation and is starting
    Started { batch_id: String, total: usize },
    /// One file reached a terminal outcome
    FileCompleted {
        progress: BatchProgress,
        filename: String,
        outcome: MoveOutcome,
    },
    /// The caller stopped the batch between files
    Cancelled { progress: BatchProgress },
    /// The batch ended; check `summary.cancelled`
    Completed { summary: BatchSummary },
}

/// Running outcome counts for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub moved: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    /// Count one more outcome
    pub fn record(&mut self, outcome: &MoveOutcome) {
        match outcome {
            MoveOutcome::Moved { .. } => self.moved += 1,
            MoveOutcome::DuplicateSkipped { .. } => self.duplicates += 1,
            MoveOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Progress snapshot emitted after each file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub files_completed: usize,
    pub files_total: usize,
    pub counts: OutcomeCounts,
}
