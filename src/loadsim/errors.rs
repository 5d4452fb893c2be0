use thiserror::Error;

use crate::encryption::EncryptionError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum LoadSimError {
    #[error("Failed to execute load simulation: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encrypt simulated entry: {0}")]
    Encryption(#[from] EncryptionError),
}

pub type Result<T> = std::result::Result<T, LoadSimError>;
