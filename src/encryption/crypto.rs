//! Cryptographic operations for folder keys and note payloads

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::errors::{EncryptionError, EncryptionResult};
use super::models::{FolderKey, FolderKeys, FolderTag, NONCE_SIZE, TAG_SIZE};

/// SHA-256 digest of arbitrary bytes
pub fn hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Hex-encoded SHA-256 digest of a string
pub fn hash_hex(text: &str) -> String {
    hex::encode(hash(text.as_bytes()))
}

/// Derive the symmetric key of a folder from the user's password.
///
/// `h1 = SHA256(password)`, `h2 = SHA256(h1 || folder)`. Every second byte of
/// `h2` is kept and hex-encoded; the resulting 32 characters are the key
/// material. The folder name must stay in the second round, otherwise all
/// folders sharing a password share a key.
pub fn derive_folder_key(password: &str, folder: &str) -> EncryptionResult<FolderKey> {
    let mut first = hash(password.as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(first);
    hasher.update(folder.as_bytes());
    let mut second: [u8; 32] = hasher.finalize().into();

    let halved: Vec<u8> = second.iter().step_by(2).copied().collect();
    let mut material = hex::encode(halved);

    first.zeroize();
    second.zeroize();

    let key = FolderKey::from_material(&material);
    material.zeroize();
    key
}

/// Storage lookup tag of a folder. Independent of the password.
pub fn derive_folder_tag(folder: &str) -> FolderTag {
    FolderTag::new(hash_hex(folder))
}

impl FolderKeys {
    /// Derive both the key and the tag of a folder
    pub fn derive(password: &str, folder: &str) -> EncryptionResult<Self> {
        Ok(Self {
            key: derive_folder_key(password, folder)?,
            tag: derive_folder_tag(folder),
        })
    }
}

/// Generate a random nonce for encryption
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// ChaCha20-Poly1305 cipher bound to one key.
///
/// Ciphertexts are laid out as `nonce || ciphertext || tag`.
#[derive(Clone)]
pub struct Crypter {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for Crypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crypter").finish_non_exhaustive()
    }
}

impl Crypter {
    /// Build a crypter from textual key material (padded, at most 32 bytes)
    pub fn new(material: &str) -> EncryptionResult<Self> {
        let key = FolderKey::from_material(material)?;
        Self::from_key(&key)
    }

    /// Build a crypter from an already derived key
    pub fn from_key(key: &FolderKey) -> EncryptionResult<Self> {
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|e| EncryptionError::CipherInit(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt with a fresh random nonce, prepended to the output
    pub fn encrypt(&self, plaintext: &[u8]) -> EncryptionResult<Vec<u8>> {
        let nonce_bytes = generate_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt data produced by [`Crypter::encrypt`].
    ///
    /// Any modification of the input, or a different key, yields
    /// [`EncryptionError::AuthenticationFailed`].
    pub fn decrypt(&self, encrypted: &[u8]) -> EncryptionResult<Vec<u8>> {
        if encrypted.len() < NONCE_SIZE + TAG_SIZE {
            return Err(EncryptionError::AuthenticationFailed);
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| EncryptionError::AuthenticationFailed)
    }
}

/// Encrypt data under a folder key
pub fn encrypt(key: &FolderKey, plaintext: &[u8]) -> EncryptionResult<Vec<u8>> {
    Crypter::from_key(key)?.encrypt(plaintext)
}

/// Decrypt data under a folder key
pub fn decrypt(key: &FolderKey, encrypted: &[u8]) -> EncryptionResult<Vec<u8>> {
    Crypter::from_key(key)?.decrypt(encrypted)
}
