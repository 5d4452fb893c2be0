//! Encryption error types

use thiserror::Error;

/// Errors that can occur during encryption operations
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Key cannot be more than 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Failed to create cipher: {0}")]
    CipherInit(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Integrity check failed: wrong key or tampered ciphertext.
    #[error("Authentication failed: wrong password or corrupted data")]
    AuthenticationFailed,
}

impl EncryptionError {
    /// Whether this error is a configuration problem that must not be retried
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidKeyLength(_) | Self::CipherInit(_))
    }
}

/// Result type alias for encryption operations
pub type EncryptionResult<T> = Result<T, EncryptionError>;
