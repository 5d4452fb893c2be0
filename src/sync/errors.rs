use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unable to retrieve notes: {0:#}")]
    Pull(#[source] anyhow::Error),

    #[error("Failed to update note {id}: {source:#}")]
    Push {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Sync service was stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("Sync service must be started from within a Tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, SyncError>;
