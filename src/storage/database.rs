//! Embedded key-value database on top of SQLite.
//!
//! Values live in named buckets; every bucket maps byte keys to byte values.
//! All reads and writes go through transactions. Write transactions start
//! with `BEGIN IMMEDIATE`, so SQLite admits a single writer at a time and a
//! second writer waits on the busy timeout until the first one commits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::errors::{Result, StorageError};

/// Bucket holding one encrypted blob per folder
pub const DEFAULT_BUCKET_NAME: &str = "notes";

/// How long a writer waits for the previous writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_buckets (
        name TEXT PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS kv_entries (
        bucket TEXT NOT NULL,
        key BLOB NOT NULL,
        value BLOB NOT NULL,
        PRIMARY KEY (bucket, key)
    ) WITHOUT ROWID;
"#;

/// Handle to a database file.
///
/// Cloning is cheap. Every component that needs the database opens its own
/// [`Session`]; the engine coordinates them.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open or create a database file and make sure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Self { path };
        let session = db.connect()?;
        session.conn.execute_batch(SCHEMA)?;

        log::debug!("Opened database at {:?}", db.path);
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new connection to the database
    pub fn connect(&self) -> Result<Session> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Session { conn })
    }

    /// Create a bucket if it does not exist yet
    pub fn create_bucket_if_not_exists(&self, name: &str) -> Result<()> {
        self.connect()?.update(|tx| {
            tx.create_bucket_if_not_exists(name)?;
            Ok::<_, StorageError>(())
        })
    }
}

/// One connection to the database
pub struct Session {
    conn: Connection,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Run `f` inside a write transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise.
    pub fn update<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Tx<'_>) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        let tx = Tx { tx };

        let value = f(&tx)?;
        tx.tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }

    /// Run `f` inside a read transaction. Nothing is committed.
    pub fn view<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Tx<'_>) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(StorageError::from)?;
        let tx = Tx { tx };

        f(&tx)
    }
}

/// An open transaction
pub struct Tx<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> Tx<'conn> {
    /// Access an existing bucket
    pub fn bucket(&self, name: &str) -> Result<Bucket<'_>> {
        let exists = self
            .tx
            .query_row(
                "SELECT 1 FROM kv_buckets WHERE name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if !exists {
            return Err(StorageError::BucketNotFound(name.to_string()));
        }

        Ok(Bucket {
            conn: &self.tx,
            name: name.to_string(),
        })
    }

    /// Access a bucket, registering it first if needed
    pub fn create_bucket_if_not_exists(&self, name: &str) -> Result<Bucket<'_>> {
        self.tx.execute(
            "INSERT OR IGNORE INTO kv_buckets (name) VALUES (?1)",
            params![name],
        )?;

        Ok(Bucket {
            conn: &self.tx,
            name: name.to_string(),
        })
    }
}

/// Key-value view of one bucket inside a transaction
pub struct Bucket<'tx> {
    conn: &'tx Connection,
    name: String,
}

impl<'tx> Bucket<'tx> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE bucket = ?1 AND key = ?2",
                params![self.name, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value stored under `key`
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_entries (bucket, key, value) VALUES (?1, ?2, ?3)",
            params![self.name, key, value],
        )?;
        Ok(())
    }

    /// Remove `key`. Returns whether something was removed.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM kv_entries WHERE bucket = ?1 AND key = ?2",
            params![self.name, key],
        )?;
        Ok(removed > 0)
    }

    /// Number of entries in the bucket
    pub fn len(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM kv_entries WHERE bucket = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Visit every entry in key order
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM kv_entries WHERE bucket = ?1 ORDER BY key")?;
        let mut rows = stmt.query(params![self.name])?;

        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            f(&key, &value)?;
        }

        Ok(())
    }

    /// Entry at ordinal position `index` in key order, found by scanning
    pub fn nth(&self, index: u64) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM kv_entries WHERE bucket = ?1 ORDER BY key")?;
        let mut rows = stmt.query(params![self.name])?;

        let mut position = 0u64;
        while let Some(row) = rows.next()? {
            if position == index {
                return Ok(Some((row.get(0)?, row.get(1)?)));
            }
            position += 1;
        }

        Ok(None)
    }
}
