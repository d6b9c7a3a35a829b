//! Presentation adapter for dupegrid.
//!
//! Translates the engine's state into the three row levels the review UI
//! draws, accepts the UI's actions, and drives a session from a channel:
//!
//! - **Rows** - group, inode and path rows with resolved selection flags
//! - **Actions** - serde-tagged UI actions applied against the owning group
//! - **Session** - single owner of records and state, optionally on a task
//!
//! ```rust,ignore
//! use dupegrid_view::{ReviewSession, SessionEvent, SessionUpdate, spawn_session};
//!
//! let (events, mut updates) = spawn_session(ReviewSession::default());
//! events.send(SessionEvent::Records(raws)).await?;
//!
//! while let Some(update) = updates.recv().await {
//!     if let SessionUpdate::Frame(frame) = update {
//!         println!("{} groups", frame.groups.len());
//!     }
//! }
//! ```

mod action;
mod rows;
mod session;

pub use action::{ActionOutcome, UiAction};
pub use rows::{FrameStats, GroupRow, InodeRow, PathRow, RenderFrame, Row, RowKind};
pub use session::{
    IngestSummary, ReviewSession, SESSION_CHANNEL_SIZE, SessionEvent, SessionUpdate,
    spawn_session,
};
