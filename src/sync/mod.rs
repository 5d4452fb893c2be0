//! Periodic reconciliation of in-memory notes with storage
//!
//! The service is decoupled from the repository: it only sees a pull
//! function (current notes) and a push function (persist one note).

pub mod config;
mod errors;
mod reconciler;
mod service;

pub use config::SyncConfig;
pub use errors::{Result, SyncError};
pub use reconciler::{fingerprint, PassReport, PullNotes, PushNote, Reconciler};
pub use service::{ErrorSink, SyncService, SyncState};
