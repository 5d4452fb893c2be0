//! Encryption module for password-scoped note folders
//!
//! This module provides:
//! - SHA-256 hashing used for key derivation, folder tags and content fingerprints
//! - Two-stage, folder-mixed derivation of per-folder keys
//! - ChaCha20-Poly1305 authenticated encryption with a random nonce per call

pub mod crypto;
pub mod errors;
pub mod models;

// Re-export commonly used types
pub use crypto::{
    decrypt, derive_folder_key, derive_folder_tag, encrypt, hash, hash_hex, Crypter,
};
pub use errors::{EncryptionError, EncryptionResult};
pub use models::{FolderKey, FolderKeys, FolderTag, FILLER, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
