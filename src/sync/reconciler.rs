//! Fingerprint-based reconciliation of in-memory notes with storage.
//!
//! There is no change log. Each pass hashes the text of every in-memory note
//! and pushes the notes whose hash differs from the one recorded at their
//! last successful push.

use std::collections::HashMap;

use super::errors::{Result, SyncError};
use crate::encryption::hash_hex;
use crate::storage::Note;

/// Reads the current in-memory note collection
pub type PullNotes = Box<dyn Fn() -> anyhow::Result<Vec<Note>> + Send + Sync>;

/// Persists one note
pub type PushNote = Box<dyn Fn(&Note) -> anyhow::Result<()> + Send + Sync>;

/// Content fingerprint of a note: hex SHA-256 of its text
pub fn fingerprint(note: &Note) -> String {
    hash_hex(&note.text)
}

/// Outcome of one successful pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Notes returned by the pull function
    pub examined: usize,
    /// Ids pushed during the pass, in push order
    pub pushed: Vec<String>,
}

pub struct Reconciler {
    pull: PullNotes,
    push: PushNote,
    /// note id -> fingerprint at last successful push
    flushed: HashMap<String, String>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("tracked", &self.flushed.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler and record the fingerprints of the notes that
    /// exist right now, so they are not pushed again on the first pass.
    ///
    /// If the initial read fails, nothing is recorded and the first pass
    /// pushes every note.
    pub fn new<P, W>(pull: P, push: W) -> Self
    where
        P: Fn() -> anyhow::Result<Vec<Note>> + Send + Sync + 'static,
        W: Fn(&Note) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let flushed = match pull() {
            Ok(notes) => notes
                .iter()
                .map(|note| (note.id.clone(), fingerprint(note)))
                .collect(),
            Err(e) => {
                log::warn!("Sync: initial read failed, every note will be pushed: {:#}", e);
                HashMap::new()
            }
        };

        Self {
            pull: Box::new(pull),
            push: Box::new(push),
            flushed,
        }
    }

    /// Fingerprint recorded at the last successful push of `id`
    pub fn recorded(&self, id: &str) -> Option<&str> {
        self.flushed.get(id).map(String::as_str)
    }

    /// Run one reconciliation pass.
    ///
    /// Stops at the first failed push. The failed note and the notes after it
    /// keep their old fingerprints and are retried by the next pass.
    pub fn run_pass(&mut self) -> Result<PassReport> {
        let notes = (self.pull)().map_err(SyncError::Pull)?;
        let mut report = PassReport {
            examined: notes.len(),
            pushed: Vec::new(),
        };

        for note in &notes {
            let current = fingerprint(note);
            if self.flushed.get(&note.id) == Some(&current) {
                continue;
            }

            (self.push)(note).map_err(|source| SyncError::Push {
                id: note.id.clone(),
                source,
            })?;

            self.flushed.insert(note.id.clone(), current);
            report.pushed.push(note.id.clone());
        }

        Ok(report)
    }
}
