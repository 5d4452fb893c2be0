use thiserror::Error;

use crate::encryption::EncryptionError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credentials not found")]
    CredentialsNotFound,

    #[error("corrupted credentials: {0}")]
    CorruptedCredentials(String),

    #[error("failed to base 64 decode serialized data: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to decrypt: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
