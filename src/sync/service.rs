//! Background sync service.
//!
//! Drives a [`Reconciler`] on a Tokio timer. The service goes through
//! `Idle -> Running -> Stopped` exactly once; a stopped service cannot be
//! restarted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::config::SyncConfig;
use super::errors::{Result, SyncError};
use super::reconciler::{PassReport, Reconciler};
use crate::storage::Note;

/// Receives errors of passes run in the background
pub type ErrorSink = Arc<dyn Fn(SyncError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Running,
    Stopped,
}

pub struct SyncService {
    reconciler: Arc<Mutex<Reconciler>>,
    on_error: ErrorSink,
    interval: Duration,
    state: Arc<Mutex<SyncState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SyncService {
    /// Create an idle sync service.
    ///
    /// `pull` is called once here to record which notes are already in sync.
    pub fn new<P, W, E>(pull: P, push: W, on_error: E, interval: Duration) -> Self
    where
        P: Fn() -> anyhow::Result<Vec<Note>> + Send + Sync + 'static,
        W: Fn(&Note) -> anyhow::Result<()> + Send + Sync + 'static,
        E: Fn(SyncError) + Send + Sync + 'static,
    {
        Self {
            reconciler: Arc::new(Mutex::new(Reconciler::new(pull, push))),
            on_error: Arc::new(on_error),
            interval: SyncConfig::with_interval(interval).interval(),
            state: Arc::new(Mutex::new(SyncState::Idle)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Create an idle sync service whose errors are logged
    pub fn with_config<P, W>(pull: P, push: W, config: &SyncConfig) -> Self
    where
        P: Fn() -> anyhow::Result<Vec<Note>> + Send + Sync + 'static,
        W: Fn(&Note) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(
            pull,
            push,
            |err| log::error!("Sync service: {}", err),
            config.interval(),
        )
    }

    pub fn state(&self) -> SyncState {
        *lock(&self.state)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start periodic reconciliation.
    ///
    /// A no-op while running. Fails once the service has been stopped, or when
    /// called outside a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if self.cancel.is_cancelled() {
            return Err(SyncError::AlreadyStopped);
        }
        match *state {
            SyncState::Running => return Ok(()),
            SyncState::Stopped => return Err(SyncError::AlreadyStopped),
            SyncState::Idle => {}
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let handle = runtime.spawn(sync_loop(
            Arc::clone(&self.reconciler),
            Arc::clone(&self.on_error),
            self.interval,
            self.cancel.clone(),
            Arc::clone(&self.state),
        ));

        *lock(&self.task) = Some(handle);
        *state = SyncState::Running;
        Ok(())
    }

    /// Ask the service to stop. Safe to call repeatedly and from any task.
    ///
    /// The service reports `Stopped` immediately; a pass already in progress
    /// still runs to completion. Use [`SyncService::stopped`] to wait for it.
    pub fn stop(&self) {
        let mut state = lock(&self.state);
        self.cancel.cancel();
        *state = SyncState::Stopped;
    }

    /// Wait until the background loop has exited
    pub async fn stopped(&self) {
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::error!("Sync service: background task failed: {}", e);
            }
        }
    }

    /// Run one pass right now, outside the timer (e.g. a final flush)
    pub fn run_once(&self) -> Result<PassReport> {
        lock(&self.reconciler).run_pass()
    }
}

async fn sync_loop(
    reconciler: Arc<Mutex<Reconciler>>,
    on_error: ErrorSink,
    interval: Duration,
    cancel: CancellationToken,
    state: Arc<Mutex<SyncState>>,
) {
    log::info!("Sync service started, interval {:?}", interval);

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                let reconciler = Arc::clone(&reconciler);
                let outcome = tokio::task::spawn_blocking(move || lock(&reconciler).run_pass()).await;

                match outcome {
                    Ok(Ok(report)) => {
                        if !report.pushed.is_empty() {
                            log::debug!(
                                "Sync service: pushed {} of {} note(s)",
                                report.pushed.len(),
                                report.examined
                            );
                        }
                    }
                    Ok(Err(e)) => on_error(e),
                    Err(e) => log::error!("Sync service: reconciliation pass panicked: {}", e),
                }
            }
        }
    }

    *lock(&state) = SyncState::Stopped;
    log::info!("Sync service: stopped");
}
