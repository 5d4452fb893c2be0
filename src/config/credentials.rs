//! "Stay signed in": the folder name and password, encrypted in the config store

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::{ConfigError, Result};
use super::store::ConfigStore;
use crate::encryption::Crypter;

/// Config key holding the encrypted credentials
pub const CREDENTIALS_KEY: &str = "ENCRYPTED_DATA_MAIN";

/// Config key holding the database path
pub const DB_PATH_KEY: &str = "DB_PATH";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    /// Folder name
    pub identifier: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

pub fn store_db_path<S: ConfigStore + ?Sized>(store: &S, path: &str) -> Result<()> {
    store.set_string(DB_PATH_KEY, path)
}

/// Stored database path, if one was set
pub fn db_path<S: ConfigStore + ?Sized>(store: &S) -> Option<PathBuf> {
    store
        .get_string(DB_PATH_KEY)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// `<local data dir>/soul/soul.db`
pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("soul").join("soul.db"))
}

pub fn is_signed_in<S: ConfigStore + ?Sized>(store: &S) -> bool {
    store
        .get_string(CREDENTIALS_KEY)
        .is_some_and(|value| !value.trim().is_empty())
}

pub fn set_credentials<S: ConfigStore + ?Sized>(
    store: &S,
    crypter: &Crypter,
    credentials: &Credentials,
) -> Result<()> {
    let mut encoded = serde_json::to_vec(credentials)?;
    let encrypted = crypter.encrypt(&encoded);
    encoded.zeroize();

    store.set_string(CREDENTIALS_KEY, &STANDARD.encode(encrypted?))
}

/// Read back the credentials stored by [`set_credentials`].
///
/// A wrong `crypter` yields [`EncryptionError::AuthenticationFailed`](crate::encryption::EncryptionError::AuthenticationFailed).
pub fn get_credentials<S: ConfigStore + ?Sized>(store: &S, crypter: &Crypter) -> Result<Credentials> {
    let serialized = store
        .get_string(CREDENTIALS_KEY)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::CredentialsNotFound)?;

    let encrypted = STANDARD.decode(serialized.trim())?;
    let mut decrypted = crypter.decrypt(&encrypted)?;
    let credentials = serde_json::from_slice(&decrypted)
        .map_err(|e| ConfigError::CorruptedCredentials(e.to_string()));
    decrypted.zeroize();

    credentials
}

pub fn delete_credentials<S: ConfigStore + ?Sized>(store: &S) -> Result<()> {
    store.delete(CREDENTIALS_KEY)
}
