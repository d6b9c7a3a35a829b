//! dupegrid - Review duplicate and hardlinked files.
//!
//! Usage:
//!   dupegrid show <SNAPSHOT>                     Print the duplicate hierarchy
//!   dupegrid replay <DELIVERIES> [--actions F]   Replay deliveries and actions
//!   dupegrid --help                              Show help

mod logging;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, info};

use dupegrid_core::ReviewConfig;
use dupegrid_engine::DeletionPlan;
use dupegrid_store::{RawRecord, load_deliveries, load_snapshot};
use dupegrid_view::{
    IngestSummary, RenderFrame, ReviewSession, Row, SessionEvent, SessionUpdate, UiAction,
    spawn_session,
};

#[derive(Parser)]
#[command(
    name = "dupegrid",
    version,
    about = "Review duplicate and hardlinked files",
    long_about = "dupegrid groups file records by content, then by inode, then by path, \
                  and keeps track of which path to keep and which to delete.\n\n\
                  Records come from snapshot files captured from the record store."
)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one snapshot and print the duplicate hierarchy
    Show {
        /// Snapshot file: a JSON array of records, or an array of deliveries
        snapshot: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Feed deliveries through a session and print the final state
    Replay {
        /// JSON array of deliveries, each an array of records
        deliveries: PathBuf,

        /// JSON array of `{ "after": <delivery index>, "action": ... }`
        #[arg(short, long)]
        actions: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A UI action applied after a given delivery.
#[derive(Debug, Clone, Deserialize)]
struct ScheduledAction {
    after: usize,
    action: UiAction,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::init_logger();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Show { snapshot, format } => run_show(&config, &snapshot, format)?,
        Command::Replay {
            deliveries,
            actions,
            format,
        } => run_replay(&config, &deliveries, actions.as_deref(), format).await?,
    }

    Ok(())
}

/// Load the config from an explicit path or the default location.
fn load_config(path: Option<&Path>) -> Result<ReviewConfig> {
    let config = match path {
        Some(path) => ReviewConfig::load(path)?,
        None => ReviewConfig::load_default()?,
    };
    debug!(?config, "Loaded config");
    Ok(config)
}

/// Ingest one snapshot and print it.
fn run_show(config: &ReviewConfig, snapshot: &Path, format: OutputFormat) -> Result<()> {
    let raws = load_snapshot(snapshot)?;
    let mut session = ReviewSession::new(config)?;

    let summary = session.ingest(raws);
    report_ingest(&summary);

    let frame = session.render();
    match format {
        OutputFormat::Text => print_frame(&frame),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&frame)?),
    }

    Ok(())
}

/// Replay deliveries and scheduled actions through a spawned session.
async fn run_replay(
    config: &ReviewConfig,
    deliveries: &Path,
    actions: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let deliveries = load_deliveries(deliveries)?;
    let actions = match actions {
        Some(path) => load_actions(path)?,
        None => Vec::new(),
    };
    info!(
        deliveries = deliveries.len(),
        actions = actions.len(),
        "Replaying"
    );

    let (events, mut updates) = spawn_session(ReviewSession::new(config)?);

    // Feed from a separate task so a full update channel cannot stall us.
    let feeder = tokio::spawn(feed(events, deliveries, actions));

    let mut frame = RenderFrame::default();
    let mut plan = DeletionPlan::default();
    while let Some(update) = updates.recv().await {
        match update {
            SessionUpdate::Ingested(summary) => report_ingest(&summary),
            SessionUpdate::Frame(next) => frame = next,
            SessionUpdate::Rejected { action, error } => {
                eprintln!("Rejected {}: {}", action.name(), error);
            }
            SessionUpdate::Plan(next) => plan = next,
        }
    }
    feeder.await.context("Replay feeder panicked")??;

    match format {
        OutputFormat::Text => {
            print_frame(&frame);
            print_plan(&plan);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({ "frame": frame, "plan": plan });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Send every delivery, each followed by its scheduled actions.
async fn feed(
    events: tokio::sync::mpsc::Sender<SessionEvent>,
    deliveries: Vec<Vec<RawRecord>>,
    actions: Vec<ScheduledAction>,
) -> Result<()> {
    let stopped = || eyre!("Session stopped early");

    for (index, delivery) in deliveries.into_iter().enumerate() {
        events
            .send(SessionEvent::Records(delivery))
            .await
            .map_err(|_| stopped())?;
        for scheduled in actions.iter().filter(|a| a.after == index) {
            events
                .send(SessionEvent::Action(scheduled.action.clone()))
                .await
                .map_err(|_| stopped())?;
        }
    }

    events
        .send(SessionEvent::Plan)
        .await
        .map_err(|_| stopped())?;
    events
        .send(SessionEvent::Shutdown)
        .await
        .map_err(|_| stopped())?;
    Ok(())
}

/// Load a scheduled actions file.
fn load_actions(path: &Path) -> Result<Vec<ScheduledAction>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read actions {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse actions {}", path.display()))
}

/// Report rejected records of a delivery on stderr.
fn report_ingest(summary: &IngestSummary) {
    for rejected in &summary.rejected {
        eprintln!("Skipped record #{}: {}", rejected.index, rejected.error);
    }
    if !summary.warnings.is_empty() {
        eprintln!("{} integrity warning(s)", summary.warnings.len());
    }
}

/// Print the hierarchy as indented text.
fn print_frame(frame: &RenderFrame) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Duplicate Review (generation {})", frame.generation);
    println!("{}", "─".repeat(70));
    println!();

    if frame.is_empty() {
        println!(" No duplicate files found.");
    } else {
        println!(
            " {} groups, {} inodes, {} paths",
            frame.stats.group_count, frame.stats.inode_count, frame.stats.path_count
        );
        println!(
            " Freeable space: {}",
            format_size(frame.stats.freeable_bytes)
        );
        println!();

        for row in frame.flatten() {
            let indent = "  ".repeat(row.depth() + 1);
            println!("{indent}{}", describe(&row));
        }
    }

    if frame.pending_count > 0 {
        println!();
        println!(" {} record(s) waiting for a hash", frame.pending_count);
    }
    if frame.stats.warning_count > 0 {
        println!(
            " {} record(s) whose link count disagrees with their paths",
            frame.stats.warning_count
        );
    }
    println!();
}

/// One line of text for a row.
fn describe(row: &Row<'_>) -> String {
    match row {
        Row::Group(group) => {
            let mut line = format!(
                "{} ({} each, {} inodes, {} freeable)",
                group.hash,
                format_size(group.size),
                group.inode_count,
                format_size(group.freeable_bytes)
            );
            if group.all_set {
                line.push_str(" [all]");
            }
            line
        }
        Row::Inode(inode) => {
            let label = match inode.path {
                Some(ref path) => format!("{path} (ino {})", inode.ino),
                None => format!("ino {} ({} links)", inode.ino, inode.paths.len()),
            };
            // Flags of a link set are shown on its path rows.
            let own_flags = inode.paths.is_empty();
            with_markers(
                label,
                [
                    (inode.is_hardlinked, "[link]"),
                    (own_flags && inode.original, "[orig]"),
                    (own_flags && inode.delete, "[del]"),
                ],
            )
        }
        Row::Path(path) => with_markers(
            path.path.to_string(),
            [
                (path.is_hardlinked, "[link]"),
                (path.original, "[orig]"),
                (path.delete, "[del]"),
            ],
        ),
    }
}

/// Append the markers whose flag is set.
fn with_markers<const N: usize>(label: String, markers: [(bool, &str); N]) -> String {
    let markers = markers
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, marker)| marker)
        .join(" ");
    if markers.is_empty() {
        label
    } else {
        format!("{label} {markers}")
    }
}

/// Print the deletion plan.
fn print_plan(plan: &DeletionPlan) {
    println!(" Deletion plan: {}", plan.summary());
    for entry in &plan.entries {
        println!(
            "   {} ({}, keeping {})",
            entry.path,
            format_size(entry.size),
            entry.original
        );
    }
    for failure in &plan.failures {
        println!("   ! {failure}");
    }
    println!(" Reclaimable: {}", format_size(plan.reclaimable_bytes));
    println!();
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
