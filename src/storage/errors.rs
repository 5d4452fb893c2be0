//! Storage error types

use thiserror::Error;

use crate::encryption::EncryptionError;

/// Error taxonomy callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad key length or cipher construction failure. Never retried.
    Configuration,
    /// Wrong password or tampered ciphertext. Re-prompt for credentials.
    Authentication,
    /// Update of an id that is not in the folder.
    NotFound,
    /// Stored folder blob could not be decoded.
    Serialization,
    /// Underlying database or filesystem failure.
    TransientIo,
    /// Caller passed something the operation does not accept.
    InvalidInput,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid encryption configuration: {0}")]
    Configuration(#[source] EncryptionError),

    #[error("Failed to decrypt folder: wrong password or corrupted data")]
    AuthenticationFailed,

    #[error("Note not found in folder, cannot update: {0}")]
    NoteNotFound(String),

    #[error("Note is already assigned an id: {0}")]
    IdAlreadyAssigned(String),

    #[error("Failed to encode or decode notes: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Encryption error: {0}")]
    Encryption(#[source] EncryptionError),
}

impl From<EncryptionError> for StorageError {
    fn from(err: EncryptionError) -> Self {
        match err {
            EncryptionError::AuthenticationFailed => Self::AuthenticationFailed,
            err if err.is_configuration() => Self::Configuration(err),
            err => Self::Encryption(err),
        }
    }
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::AuthenticationFailed => ErrorKind::Authentication,
            Self::NoteNotFound(_) => ErrorKind::NotFound,
            Self::IdAlreadyAssigned(_) => ErrorKind::InvalidInput,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Database(_) | Self::Io(_) | Self::BucketNotFound(_) | Self::Encryption(_) => {
                ErrorKind::TransientIo
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_errors_are_classified() {
        let auth: StorageError = EncryptionError::AuthenticationFailed.into();
        assert_eq!(auth.kind(), ErrorKind::Authentication);

        let config: StorageError = EncryptionError::InvalidKeyLength(40).into();
        assert_eq!(config.kind(), ErrorKind::Configuration);

        let other: StorageError = EncryptionError::EncryptionFailed("boom".into()).into();
        assert_eq!(other.kind(), ErrorKind::TransientIo);
    }

    #[test]
    fn test_not_found_is_distinct_from_authentication() {
        let err = StorageError::NoteNotFound("n1".into());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_ne!(err.kind(), StorageError::AuthenticationFailed.kind());
    }
}
