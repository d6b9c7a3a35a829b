//! The review session: single owner of records, hierarchy and selections.
//!
//! Record deliveries and UI actions are both applied through one
//! [`ReviewSession`]. [`spawn_session`] moves a session onto a tokio task
//! that processes events strictly in arrival order, so every mutation runs
//! to completion before the next one starts.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use dupegrid_core::{
    ConfigError, DomainKey, FileRecord, Ino, IntegrityWarning, PathKey, ReviewConfig,
    SelectionError,
};
use dupegrid_engine::{DeletionPlan, ReconcileReport, Reconciler, ReviewState};
use dupegrid_store::{RawRecord, RecordSet, Rejected, ingest};

use crate::action::{ActionOutcome, UiAction};
use crate::rows::RenderFrame;

/// Default channel buffer size for session events and updates.
pub const SESSION_CHANNEL_SIZE: usize = 100;

/// Result of ingesting one delivery.
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    /// Generation of the state built from the delivery.
    pub generation: u64,
    /// Records accepted into the record set.
    pub accepted: usize,
    /// Entities excluded as malformed.
    pub rejected: Vec<Rejected>,
    /// Warnings raised while parsing and merging.
    pub warnings: Vec<IntegrityWarning>,
    /// What happened to existing selections.
    pub report: ReconcileReport,
}

/// Owns the record set and the current review state.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    delimiter: char,
    reconciler: Reconciler,
    records: RecordSet,
    state: ReviewState,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self {
            delimiter: ReviewConfig::default().path_delimiter,
            reconciler: Reconciler::default(),
            records: RecordSet::new(),
            state: ReviewState::new(),
        }
    }
}

impl ReviewSession {
    /// Create an empty session.
    pub fn new(config: &ReviewConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delimiter: config.path_delimiter,
            reconciler: Reconciler::from_config(config)?,
            ..Default::default()
        })
    }

    /// Ingest one raw delivery from the record store.
    ///
    /// The delivery is authoritative: inodes missing from it are dropped.
    pub fn ingest(&mut self, raws: Vec<RawRecord>) -> IngestSummary {
        let batch = ingest(raws, self.delimiter);
        let mut summary = self.ingest_records(batch.records);
        summary.rejected = batch.rejected;
        summary.warnings.splice(0..0, batch.warnings);
        summary
    }

    /// Ingest one delivery of already parsed records.
    pub fn ingest_records(&mut self, records: Vec<FileRecord>) -> IngestSummary {
        let replaced = self.records.replace_all(records);
        let (state, report) = self.reconciler.reconcile(&self.state, &self.records);
        self.state = state;

        IngestSummary {
            generation: self.state.generation,
            accepted: self.records.len(),
            rejected: Vec::new(),
            warnings: replaced.warnings,
            report,
        }
    }

    /// Apply one UI action to the current state.
    ///
    /// A stale action leaves the state untouched; the caller should re-render.
    pub fn apply(&mut self, action: &UiAction) -> Result<ActionOutcome, SelectionError> {
        debug!(action = action.name(), "Applying action");
        let state = &mut self.state;

        match action {
            UiAction::SetOriginal { ino, path } => {
                let key = owner(state, *ino, path)?;
                state.set_original(&key, *ino, path)?;
                Ok(ActionOutcome::OriginalSet)
            }
            UiAction::ToggleDelete { ino, path } => {
                let key = owner(state, *ino, path)?;
                state
                    .toggle_delete(&key, *ino, path)
                    .map(ActionOutcome::DeleteToggled)
            }
            UiAction::ClearOriginal { hash, size } => {
                let key = live_group(state, hash, *size)?;
                Ok(ActionOutcome::OriginalCleared(
                    state.selections.clear_original(&key),
                ))
            }
            UiAction::MarkGroupDelete { hash, size } => {
                let key = DomainKey::new(hash.clone(), *size);
                state
                    .mark_group_delete(&key)
                    .map(ActionOutcome::DeletesMarked)
            }
            UiAction::ClearGroupDeletes { hash, size } => {
                let key = live_group(state, hash, *size)?;
                Ok(ActionOutcome::DeletesCleared(
                    state.selections.clear_group_deletes(&key),
                ))
            }
            UiAction::ClearQueue => Ok(ActionOutcome::DeletesCleared(
                state.selections.clear_all_deletes(),
            )),
        }
    }

    /// Render the current state.
    pub fn render(&self) -> RenderFrame {
        RenderFrame::from_state(&self.state)
    }

    /// Build the deletion plan for the current selections.
    pub fn plan(&self) -> DeletionPlan {
        DeletionPlan::from_state(&self.state)
    }

    /// The current review state.
    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    /// The current record set.
    pub fn records(&self) -> &RecordSet {
        &self.records
    }
}

/// Resolve the group owning a pair's inode.
fn owner(state: &ReviewState, ino: Ino, path: &str) -> Result<DomainKey, SelectionError> {
    state
        .owner_of(ino)
        .cloned()
        .ok_or_else(|| SelectionError::Unowned {
            pair: PathKey::new(ino, path),
        })
}

/// Resolve the key of a group that exists in the current hierarchy.
fn live_group(state: &ReviewState, hash: &str, size: u64) -> Result<DomainKey, SelectionError> {
    let key = DomainKey::new(hash, size);
    match state.hierarchy.group(&key) {
        Some(_) => Ok(key),
        None => Err(SelectionError::UnknownGroup { key }),
    }
}

/// Input to a spawned session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A full delivery from the record store.
    Records(Vec<RawRecord>),
    /// A user action.
    Action(UiAction),
    /// Request the current deletion plan.
    Plan,
    /// Stop processing.
    Shutdown,
}

/// Output of a spawned session.
#[derive(Debug)]
pub enum SessionUpdate {
    /// A delivery was ingested.
    Ingested(IngestSummary),
    /// The state changed and should be redrawn.
    Frame(RenderFrame),
    /// An action was refused; a fresh frame follows.
    Rejected {
        action: UiAction,
        error: SelectionError,
    },
    /// The current deletion plan.
    Plan(DeletionPlan),
}

/// Run a session on a tokio task.
///
/// Returns the event sender and the update receiver. The task ends on
/// [`SessionEvent::Shutdown`], when every sender is dropped, or when the
/// receiver is dropped.
pub fn spawn_session(
    session: ReviewSession,
) -> (mpsc::Sender<SessionEvent>, mpsc::Receiver<SessionUpdate>) {
    let (event_tx, event_rx) = mpsc::channel(SESSION_CHANNEL_SIZE);
    let (update_tx, update_rx) = mpsc::channel(SESSION_CHANNEL_SIZE);

    tokio::spawn(async move {
        run_session(session, event_rx, update_tx).await;
    });

    (event_tx, update_rx)
}

/// Internal event loop of a spawned session.
async fn run_session(
    mut session: ReviewSession,
    mut events: mpsc::Receiver<SessionEvent>,
    updates: mpsc::Sender<SessionUpdate>,
) {
    while let Some(event) = events.recv().await {
        let outgoing = match event {
            SessionEvent::Records(raws) => {
                let summary = session.ingest(raws);
                vec![
                    SessionUpdate::Ingested(summary),
                    SessionUpdate::Frame(session.render()),
                ]
            }
            SessionEvent::Action(action) => match session.apply(&action) {
                Ok(_) => vec![SessionUpdate::Frame(session.render())],
                Err(error) => {
                    warn!(action = action.name(), %error, "Rejected action");
                    vec![
                        SessionUpdate::Rejected { action, error },
                        SessionUpdate::Frame(session.render()),
                    ]
                }
            },
            SessionEvent::Plan => vec![SessionUpdate::Plan(session.plan())],
            SessionEvent::Shutdown => break,
        };

        for update in outgoing {
            if updates.send(update).await.is_err() {
                debug!("Update receiver dropped, stopping session");
                return;
            }
        }
    }

    info!(generation = session.state().generation, "Session stopped");
}
