//! Sequential relocation batches with per-file progress.

use super::relocator::Relocator;
use super::types::{BatchSummary, FileRecord, MoveOutcome};
use crate::config::ArchiveConfig;
use crate::core::security::ensure_free_space;
use crate::error::Result;
use crate::events::{
    BatchProgress, CancelToken, Event, EventSender, OutcomeCounts, RelocateEvent,
};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Relocate every record in `records`, one file at a time.
///
/// The archive root is validated, and its volume checked for room to hold
/// every source, before anything moves; those are the only errors this
/// returns. Per-file problems become `Failed` outcomes and the
/// batch carries on. Moved and duplicate records leave `records`; failed
/// and not-attempted ones stay, in their original order, for a retry.
///
/// `cancel` is only consulted between files.
pub fn relocate_batch(
    records: &mut Vec<FileRecord>,
    archive_root: &Path,
    relocator: &Relocator,
    config: &ArchiveConfig,
    events: &EventSender,
    cancel: &CancelToken,
) -> Result<BatchSummary> {
    let root = config.security_gate().validate_archive_root(archive_root)?;
    let required: u64 = records
        .iter()
        .filter_map(|record| fs::metadata(&record.source_path).ok())
        .map(|meta| meta.len())
        .sum();
    ensure_free_space(&root, required)?;

    let start = Instant::now();
    let batch_id = Uuid::new_v4().to_string();
    let total = records.len();
    info!("Starting batch {} with {} files", batch_id, total);
    events.send(Event::Relocate(RelocateEvent::Started {
        batch_id: batch_id.clone(),
        total,
    }));

    let mut pending = std::mem::take(records).into_iter();
    let mut counts = OutcomeCounts::default();
    let mut failures = Vec::new();
    let mut sources_retained = 0;
    let mut completed = 0;
    let mut cancelled = false;

    for mut record in pending.by_ref() {
        if cancel.is_cancelled() {
            cancelled = true;
            records.push(record);
            break;
        }

        let outcome = relocator.relocate(&mut record, &root);
        counts.record(&outcome);
        completed += 1;

        match &outcome {
            MoveOutcome::Moved {
                source_retained: true,
                ..
            } => sources_retained += 1,
            MoveOutcome::Failed { reason } => {
                failures.push((record.filename.clone(), reason.clone()));
            }
            _ => {}
        }

        let filename = record.filename.clone();
        if !outcome.is_terminal_success() {
            records.push(record);
        }

        events.send(Event::Relocate(RelocateEvent::FileCompleted {
            progress: BatchProgress {
                files_completed: completed,
                files_total: total,
                counts,
            },
            filename,
            outcome,
        }));

        if completed < total && !config.inter_file_delay.is_zero() {
            thread::sleep(config.inter_file_delay);
        }
    }

    records.extend(pending);
    let not_attempted = total - completed;

    if cancelled {
        warn!(
            "Batch {} cancelled after {} of {} files",
            batch_id, completed, total
        );
        events.send(Event::Relocate(RelocateEvent::Cancelled {
            progress: BatchProgress {
                files_completed: completed,
                files_total: total,
                counts,
            },
        }));
    }

    let summary = BatchSummary {
        batch_id,
        total,
        moved: counts.moved,
        duplicates: counts.duplicates,
        failed: counts.failed,
        not_attempted,
        sources_retained,
        cancelled,
        duration_ms: start.elapsed().as_millis() as u64,
        failures,
    };

    info!(
        "Batch {} finished: {} moved, {} duplicates, {} failed",
        summary.batch_id, summary.moved, summary.duplicates, summary.failed
    );
    events.send(Event::Relocate(RelocateEvent::Completed {
        summary: summary.clone(),
    }));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::Classification;
    use crate::error::{ArchiveError, SecurityError};
    use crate::events::{null_sender, EventChannel};
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config() -> ArchiveConfig {
        ArchiveConfig::builder()
            .inter_file_delay(Duration::ZERO)
            .build()
    }

    fn record(path: PathBuf) -> FileRecord {
        let mut classification = Classification::unknown();
        classification.year = "2022".to_string();
        classification.month = "03".to_string();
        FileRecord::new(path, "q".to_string(), classification)
    }

    fn setup(names: &[&str]) -> (TempDir, PathBuf, Vec<FileRecord>) {
        let temp = TempDir::new().unwrap();
        let drop_dir = temp.path().join("drop");
        let root = temp.path().join("archive");
        fs::create_dir_all(&drop_dir).unwrap();
        fs::create_dir_all(&root).unwrap();
        let records = names
            .iter()
            .map(|name| {
                let path = drop_dir.join(name);
                fs::write(&path, name.as_bytes()).unwrap();
                record(path)
            })
            .collect();
        (temp, root, records)
    }

    #[test]
    fn successful_records_leave_the_working_set() {
        let (_temp, root, mut records) = setup(&["a.jpg", "b.jpg"]);
        records.push(record(root.join("vanished.jpg")));
        let config = config();

        let summary = relocate_batch(
            &mut records,
            &root,
            &Relocator::new(&config),
            &config,
            &null_sender(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.moved, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].0, "vanished.jpg");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "vanished.jpg");
    }

    #[test]
    fn progress_is_reported_after_each_file() {
        let (_temp, root, mut records) = setup(&["a.jpg", "b.jpg", "c.jpg"]);
        let config = config();
        let (sender, receiver) = EventChannel::new();

        relocate_batch(
            &mut records,
            &root,
            &Relocator::new(&config),
            &config,
            &sender,
            &CancelToken::new(),
        )
        .unwrap();
        drop(sender);

        let completed: Vec<usize> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Relocate(RelocateEvent::FileCompleted { progress, .. }) => {
                    Some(progress.files_completed)
                }
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![1, 2, 3]);
    }

    #[test]
    fn cancelled_batch_keeps_unattempted_records() {
        let (_temp, root, mut records) = setup(&["a.jpg", "b.jpg"]);
        let config = config();
        let cancel = CancelToken::new();
        cancel.cancel();

        let summary = relocate_batch(
            &mut records,
            &root,
            &Relocator::new(&config),
            &config,
            &null_sender(),
            &cancel,
        )
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.not_attempted, 2);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source_path.exists()));
    }

    #[test]
    fn invalid_root_stops_before_any_file() {
        let (_temp, root, mut records) = setup(&["a.jpg"]);
        let config = config();

        let result = relocate_batch(
            &mut records,
            &root.join("missing"),
            &Relocator::new(&config),
            &config,
            &null_sender(),
            &CancelToken::new(),
        );

        assert!(matches!(
            result,
            Err(ArchiveError::Security(SecurityError::ArchiveRootMissing { .. }))
        ));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn undeletable_sources_are_counted_as_retained() {
        let (_temp, root, mut records) = setup(&["a.jpg", "b.jpg"]);
        let config = config();
        let relocator = Relocator::new(&config).with_remove_fn(Box::new(|_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"))
        }));

        let summary = relocate_batch(
            &mut records,
            &root,
            &relocator,
            &config,
            &null_sender(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(summary.moved, 2);
        assert_eq!(summary.sources_retained, 2);
        assert!(records.is_empty());
    }

    #[test]
    fn cancelled_batch_still_ends_with_completed() {
        let (_temp, root, mut records) = setup(&["a.jpg"]);
        let config = config();
        let cancel = CancelToken::new();
        cancel.cancel();
        let (sender, receiver) = EventChannel::new();

        relocate_batch(
            &mut records,
            &root,
            &Relocator::new(&config),
            &config,
            &sender,
            &cancel,
        )
        .unwrap();
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        assert!(matches!(
            events[events.len() - 2],
            Event::Relocate(RelocateEvent::Cancelled { .. })
        ));
        match events.last() {
            Some(Event::Relocate(RelocateEvent::Completed { summary })) => {
                assert!(summary.cancelled)
            }
            other => panic!("Unexpected final event: {:?}", other),
        }
    }
}
