//! Random churn against the key-value store.
//!
//! Each cycle either creates a new entry or picks a random existing one and
//! grows it, shrinks it or deletes it. Folders named as exceptions (and their
//! numbered variants) are never touched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::LoadSimConfig;
use super::errors::{LoadSimError, Result};
use super::lorem;
use crate::encryption::{hash, hash_hex, Crypter};
use crate::storage::{Database, Note, Session, StorageError, DEFAULT_BUCKET_NAME};

/// Receives errors of cycles run in the background
pub type ErrorSink = Arc<dyn Fn(LoadSimError) + Send + Sync>;

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Created,
    Grown,
    Shrunk,
    Deleted,
    /// The picked entry is protected
    Skipped,
    /// Nothing to modify
    Empty,
}

pub struct LoadSimulator {
    db: Database,
    exceptions: HashSet<Vec<u8>>,
    config: LoadSimConfig,
    on_error: ErrorSink,
}

impl std::fmt::Debug for LoadSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSimulator")
            .field("db", &self.db.path())
            .field("protected", &self.exceptions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LoadSimulator {
    /// Create a simulator protecting every folder named in `exceptions`.
    ///
    /// For each name `e`, the keys `hash_hex(e)` and `hash_hex(e + i)` for
    /// `i` in `0..exception_variants` are protected.
    pub fn new(db: Database, exceptions: &[String], config: LoadSimConfig) -> Self {
        let mut protected = HashSet::with_capacity(exceptions.len() * (config.exception_variants + 1));
        for name in exceptions {
            protected.insert(hash_hex(name).into_bytes());
            for i in 0..config.exception_variants {
                protected.insert(hash_hex(&format!("{}{}", name, i)).into_bytes());
            }
        }

        Self {
            db,
            exceptions: protected,
            config,
            on_error: Arc::new(|err| log::error!("Load simulator: {}", err)),
        }
    }

    /// Replace the default sink, which logs errors
    pub fn with_error_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(LoadSimError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(sink);
        self
    }

    pub fn is_protected(&self, key: &[u8]) -> bool {
        self.exceptions.contains(key)
    }

    /// Spawn the simulation loop on `runtime`. It runs until stopped.
    pub fn start(self, runtime: &Handle) -> LoadSimHandle {
        let cancel = CancellationToken::new();
        let task = runtime.spawn(simulation_loop(Arc::new(self), cancel.clone()));
        LoadSimHandle { cancel, task }
    }

    /// Run one cycle on a fresh connection
    pub fn run_cycle(&self) -> Result<Mutation> {
        let total = self.config.create_weight.saturating_add(self.config.modify_weight);
        let create = rand::thread_rng().gen_range(0..total.max(1)) < self.config.create_weight;

        let mut session = self.db.connect()?;
        if create {
            self.create_entry(&mut session)
        } else {
            self.modify_entry(&mut session)
        }
    }

    fn create_entry(&self, session: &mut Session) -> Result<Mutation> {
        let mut rng = rand::thread_rng();

        let name = Uuid::new_v4().simple().to_string();
        let key = hash(name[..rng.gen_range(4..=15)].as_bytes());
        let words = rng.gen_range(50..=500);
        let text = lorem::sentence(&mut rng, words);
        let value = throwaway_crypter()?.encrypt(text.as_bytes())?;

        session.update(|tx| -> Result<Mutation> {
            tx.create_bucket_if_not_exists(DEFAULT_BUCKET_NAME)?
                .put(&key, &value)?;
            Ok(Mutation::Created)
        })
    }

    fn modify_entry(&self, session: &mut Session) -> Result<Mutation> {
        let total = bucket_len(session)?;
        if total == 0 {
            return Ok(Mutation::Empty);
        }

        let mut rng = rand::thread_rng();
        let index = rng.gen_range(0..total);
        let words: i32 = rng.gen_range(-100..=600);
        let addition = lorem::sentence(&mut rng, words.max(0) as usize);
        let crypter = throwaway_crypter()?;

        session.update(|tx| -> Result<Mutation> {
            let bucket = tx.bucket(DEFAULT_BUCKET_NAME)?;

            // Entries may have vanished since they were counted.
            let Some((key, value)) = bucket.nth(index)? else {
                return Ok(Mutation::Empty);
            };

            if self.is_protected(&key) {
                return Ok(Mutation::Skipped);
            }

            match reshape(value, words, &addition, self.config.shrink_bytes) {
                Some(value) => {
                    bucket.put(&key, &crypter.encrypt(&value)?)?;
                    Ok(if words < 0 { Mutation::Shrunk } else { Mutation::Grown })
                }
                None => {
                    bucket.delete(&key)?;
                    Ok(Mutation::Deleted)
                }
            }
        })
    }

    fn random_pause(&self) -> Duration {
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.config.max_pause_ms))
    }
}

/// Stops a running simulator. Dropping the handle leaves it running.
#[derive(Debug)]
pub struct LoadSimHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LoadSimHandle {
    /// Ask the loop to exit after the current cycle. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            log::error!("Load simulator: background task failed: {}", e);
        }
    }
}

async fn simulation_loop(simulator: Arc<LoadSimulator>, cancel: CancellationToken) {
    log::info!(
        "Load simulator started on {:?}, {} protected key(s)",
        simulator.db.path(),
        simulator.exceptions.len()
    );

    while !cancel.is_cancelled() {
        let worker = Arc::clone(&simulator);
        match tokio::task::spawn_blocking(move || worker.run_cycle()).await {
            Ok(Ok(mutation)) => log::trace!("Load simulator: {:?}", mutation),
            Ok(Err(e)) => (simulator.on_error)(e),
            Err(e) => log::error!("Load simulator: cycle panicked: {}", e),
        }

        let pause = simulator.random_pause();
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    log::info!("Load simulator: stopped");
}

/// New payload of a modified entry, `None` when it should be deleted.
///
/// Negative `words` shrinks the payload by `shrink` bytes first; payloads
/// too small to shrink are deleted.
fn reshape(mut value: Vec<u8>, words: i32, addition: &str, shrink: usize) -> Option<Vec<u8>> {
    if words < 0 {
        if value.len() <= shrink + 1 {
            return None;
        }
        value.truncate(value.len() - shrink);
    }
    value.extend_from_slice(addition.as_bytes());
    Some(value)
}

fn bucket_len(session: &mut Session) -> Result<u64> {
    let len = session.view(|tx| match tx.bucket(DEFAULT_BUCKET_NAME) {
        Ok(bucket) => bucket.len(),
        Err(StorageError::BucketNotFound(_)) => Ok(0),
        Err(e) => Err(e),
    })?;
    Ok(len)
}

/// Encrypts with a random key nobody keeps
fn throwaway_crypter() -> Result<Crypter> {
    let password = Uuid::new_v4().simple().to_string();
    Ok(Crypter::new(&password[..10])?)
}

/// Number of entries in the default bucket
pub fn key_count(db: &Database) -> Result<u64> {
    bucket_len(&mut db.connect()?)
}

/// Between 1 and 80 notes of 10 to 15000 words, with ids and version 1
pub fn random_notes() -> Vec<Note> {
    random_notes_with(80, 15_000)
}

pub fn random_notes_with(max_notes: usize, max_words: usize) -> Vec<Note> {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(1..=max_notes.max(1));

    (0..count)
        .map(|_| {
            let words = rng.gen_range(10.min(max_words)..=max_words);
            Note {
                id: Uuid::new_v4().to_string(),
                version: 1,
                text: lorem::sentence(&mut rng, words),
            }
        })
        .collect()
}
