//! # CLI Module
//!
//! Command-line shell for the archiver.
//!
//! ## Usage
//! ```bash
//! # Remember the archive folder
//! lume set-archive ~/Archive
//!
//! # Archive a folder of dropped files
//! lume organize ~/Downloads/phone-dump
//!
//! # Preview targets without moving anything
//! lume organize ~/Desktop/IMG_0001.jpg --archive ~/Archive --dry-run
//!
//! # Show classification records as JSON
//! lume inspect ~/Desktop/IMG_0001.jpg
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use lume_archiver::config::{ArchiveConfig, Settings};
use lume_archiver::core::organize::{BatchSummary, IngestReport, IngestSession, MoveOutcome};
use lume_archiver::error::{ArchiveError, ConfigError, Result};
use lume_archiver::events::{
    CancelToken, Event, EventChannel, EventSender, IngestEvent, RelocateEvent,
};
use std::path::{Path, PathBuf};
use std::thread;

/// Lume - file photos into year/month/device folders without losing a byte
#[derive(Parser, Debug)]
#[command(name = "lume")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move files and folders into the archive
    Organize {
        /// Files or folders to archive
        #[arg(required = true)]
        paths: Vec<String>,

        /// Archive folder (defaults to the saved one)
        #[arg(short, long)]
        archive: Option<PathBuf>,

        /// Show planned targets without moving anything
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Show every file's outcome
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print classification records without moving anything
    Inspect {
        /// Files or folders to classify
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Validate and save the archive folder
    SetArchive {
        /// Existing, writable folder
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize {
            paths,
            archive,
            dry_run,
            output,
            verbose,
        } => run_organize(paths, archive, dry_run, output, verbose),
        Commands::Inspect { paths } => run_inspect(paths),
        Commands::SetArchive { dir } => run_set_archive(&dir),
    }
}

fn run_organize(
    paths: Vec<String>,
    archive: Option<PathBuf>,
    dry_run: bool,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);
    let archive_root = resolve_archive_root(archive)?;

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Lume").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let config = ArchiveConfig::default();
    let mut session = IngestSession::new(config.clone());
    session.set_archive_root(&archive_root)?;

    let (sender, receiver) = EventChannel::new();
    let progress = pretty.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Reading files...");
        pb
    });
    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = progress_clone.as_ref() else {
                continue;
            };
            match event {
                Event::Ingest(IngestEvent::Added { filename }) => {
                    pb.tick();
                    pb.set_message(filename);
                }
                Event::Ingest(IngestEvent::Rejected { filename, reason }) => {
                    pb.println(format!("  {} {}: {}", style("!").yellow(), filename, reason));
                }
                Event::Relocate(RelocateEvent::Started { total, .. }) => {
                    pb.set_style(bar_style());
                    pb.set_length(total as u64);
                    pb.set_position(0);
                }
                Event::Relocate(RelocateEvent::FileCompleted {
                    progress,
                    filename,
                    outcome,
                }) => {
                    pb.set_position(progress.files_completed as u64);
                    pb.set_message(filename.clone());
                    if verbose || matches!(outcome, MoveOutcome::Failed { .. }) {
                        pb.println(describe_outcome(&filename, &outcome));
                    }
                }
                Event::Relocate(RelocateEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let report = ingest_all(&mut session, &paths, &sender);
    if session.is_empty() {
        drop(sender);
        event_thread.join().ok();
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        return Err(ArchiveError::NoFiles);
    }

    if dry_run {
        drop(sender);
        event_thread.join().ok();
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        return print_plan(&term, &session, &archive_root, output);
    }

    let result = session.relocate_all(&archive_root, &sender, &CancelToken::new());

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let summary = result?;
    match output {
        OutputFormat::Pretty => print_pretty_summary(&term, &report, &summary),
        OutputFormat::Json => print_json_summary(&report, &summary)?,
    }

    Ok(())
}

fn run_inspect(paths: Vec<String>) -> Result<()> {
    let mut session = IngestSession::new(ArchiveConfig::default());
    let (sender, _receiver) = EventChannel::new();
    ingest_all(&mut session, &paths, &sender);

    println!("{}", serde_json::to_string_pretty(session.records())?);
    Ok(())
}

fn run_set_archive(dir: &Path) -> Result<()> {
    let term = Term::stderr();
    let path = Settings::default_path()?;
    let mut settings = Settings::load(&path);
    settings.set_target_folder(dir, &ArchiveConfig::default().security_gate())?;
    settings.save(&path)?;

    term.write_line(&format!(
        "{} Archive folder saved: {}",
        style("✓").green().bold(),
        dir.display()
    ))
    .ok();
    Ok(())
}

fn resolve_archive_root(archive: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = archive {
        return Ok(dir);
    }
    let settings = Settings::load(&Settings::default_path()?);
    settings
        .target_folder
        .ok_or_else(|| ConfigError::MissingArchiveRoot.into())
}

fn ingest_all(session: &mut IngestSession, paths: &[String], events: &EventSender) -> IngestReport {
    let mut total = IngestReport::default();
    for raw in paths {
        let report = session.add_path(raw, events);
        total.added += report.added;
        total.already_seen += report.already_seen;
        total.blocked += report.blocked;
        total.unsupported += report.unsupported;
        total.limit_reached |= report.limit_reached;
        if report.limit_reached {
            break;
        }
    }
    total
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn describe_outcome(filename: &str, outcome: &MoveOutcome) -> String {
    match outcome {
        MoveOutcome::Moved {
            source_retained: false,
            ..
        } => format!("  {} {}", style("✓").green(), filename),
        MoveOutcome::Moved {
            source_retained: true,
            ..
        } => format!(
            "  {} {} {}",
            style("✓").green(),
            filename,
            style("(original left in place)").yellow()
        ),
        MoveOutcome::DuplicateSkipped { .. } => {
            format!("  {} {} {}", style("=").dim(), filename, style("(duplicate)").dim())
        }
        MoveOutcome::Failed { reason } => {
            format!("  {} {}: {}", style("✗").red(), filename, reason.message)
        }
    }
}

fn print_plan(
    term: &Term,
    session: &IngestSession,
    archive_root: &Path,
    output: OutputFormat,
) -> Result<()> {
    let root = session
        .config()
        .security_gate()
        .validate_archive_root(archive_root)?;

    let planned: Vec<_> = session
        .records()
        .iter()
        .map(|record| {
            let target = session.planner().plan(record, &root);
            (record, target)
        })
        .collect();

    match output {
        OutputFormat::Json => {
            let rows: Vec<_> = planned
                .iter()
                .map(|(record, target)| match target {
                    Ok(path) => serde_json::json!({
                        "source": record.source_path,
                        "target": path,
                    }),
                    Err(e) => serde_json::json!({
                        "source": record.source_path,
                        "error": e.to_string(),
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Pretty => {
            term.write_line(&format!("{}", style("Planned moves:").bold().underlined()))
                .ok();
            for (record, target) in &planned {
                let line = match target {
                    Ok(path) => format!(
                        "  {} → {}",
                        record.filename,
                        path.strip_prefix(&root).unwrap_or(path).display()
                    ),
                    Err(e) => format!("  {} {}: {}", style("✗").red(), record.filename, e),
                };
                term.write_line(&line).ok();
            }
            term.write_line("").ok();
            term.write_line(&format!(
                "{}",
                style("Dry run: nothing was moved. Numbered names are chosen at move time.").dim()
            ))
            .ok();
        }
    }
    Ok(())
}

fn print_pretty_summary(term: &Term, report: &IngestReport, summary: &BatchSummary) {
    term.write_line("").ok();
    let headline = if summary.cancelled {
        format!("{} Organize Cancelled", style("!").yellow().bold())
    } else {
        format!("{} Organize Complete", style("✓").green().bold())
    };
    term.write_line(&headline).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files moved in {:.1}s",
        style(summary.moved).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicates skipped (originals kept)",
        style(summary.duplicates).cyan()
    ))
    .ok();

    if summary.failed > 0 {
        term.write_line(&format!("  {} failed", style(summary.failed).red()))
            .ok();
        for (filename, reason) in &summary.failures {
            term.write_line(&format!("    {} {}: {}", style("✗").red(), filename, reason.message))
                .ok();
        }
    }
    if summary.sources_retained > 0 {
        term.write_line(&format!(
            "  {} originals could not be deleted; remove them manually",
            style(summary.sources_retained).yellow()
        ))
        .ok();
    }
    if summary.not_attempted > 0 {
        term.write_line(&format!(
            "  {} files not attempted",
            style(summary.not_attempted).yellow()
        ))
        .ok();
    }

    let skipped = report.already_seen + report.blocked + report.unsupported;
    if skipped > 0 {
        term.write_line(&format!(
            "  {} files skipped at intake ({} repeated, {} blocked, {} unsupported)",
            style(skipped).dim(),
            report.already_seen,
            report.blocked,
            report.unsupported
        ))
        .ok();
    }
    if report.limit_reached {
        term.write_line(&format!(
            "  {}",
            style("File limit reached; run again for the remaining files.").yellow()
        ))
        .ok();
    }
}

fn print_json_summary(report: &IngestReport, summary: &BatchSummary) -> Result<()> {
    let output = serde_json::json!({
        "intake": report,
        "batch": summary,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
