//! Encryption data models

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::{EncryptionError, EncryptionResult};

/// Size of a ChaCha20-Poly1305 key in bytes
pub const KEY_SIZE: usize = 32;

/// Nonce size in bytes for ChaCha20-Poly1305
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size appended by ChaCha20-Poly1305
pub const TAG_SIZE: usize = 16;

/// Byte used to pad keys shorter than [`KEY_SIZE`].
///
/// WARNING: changing this makes every existing folder undecryptable.
pub const FILLER: u8 = b'u';

/// Symmetric key for one folder, with secure memory handling.
///
/// Equality is only derived for tests: it is not constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct FolderKey {
    /// The 256-bit key
    key: [u8; KEY_SIZE],
}

impl FolderKey {
    /// Create a key from raw bytes
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Build a key from textual key material.
    ///
    /// Material shorter than 32 bytes is right-padded with [`FILLER`] so the
    /// same material always yields the same key. Longer material is rejected.
    pub fn from_material(material: &str) -> EncryptionResult<Self> {
        let bytes = material.as_bytes();
        if bytes.len() > KEY_SIZE {
            return Err(EncryptionError::InvalidKeyLength(bytes.len()));
        }

        let mut key = [FILLER; KEY_SIZE];
        key[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for FolderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Non-secret storage lookup key of a folder (hex SHA-256 of its name).
///
/// Anyone who knows the folder name can compute it; it proves nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderTag(String);

impl FolderTag {
    pub(crate) fn new(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for FolderTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key and tag of a folder, derived once and cached by the repository
#[derive(Debug, Clone)]
pub struct FolderKeys {
    pub key: FolderKey,
    pub tag: FolderTag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_material_is_padded_with_filler() {
        let key = FolderKey::from_material("abc").unwrap();
        assert_eq!(&key.as_bytes()[..3], b"abc");
        assert!(key.as_bytes()[3..].iter().all(|b| *b == FILLER));
    }

    #[test]
    fn test_padding_is_deterministic() {
        let a = FolderKey::from_material("passphrasel").unwrap();
        let b = FolderKey::from_material("passphrasel").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_material_is_rejected() {
        let material = "x".repeat(KEY_SIZE + 1);
        let err = FolderKey::from_material(&material).unwrap_err();
        assert!(matches!(err, EncryptionError::InvalidKeyLength(33)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = FolderKey::from_material("secret").unwrap();
        assert!(!format!("{:?}", key).contains("secret"));
    }
}
