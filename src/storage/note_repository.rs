//! Encrypted, folder-scoped note repository.
//!
//! A folder's whole note list is stored as one encrypted value in the
//! [`DEFAULT_BUCKET_NAME`] bucket, keyed by the folder tag. Every mutation
//! decrypts the list, changes it and writes it back inside a single write
//! transaction, so a folder is never half written and concurrent writers
//! on the same folder are serialized by the database.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use uuid::Uuid;

use super::database::{Bucket, Database, Session, DEFAULT_BUCKET_NAME};
use super::errors::{Result, StorageError};
use super::models::Note;
use crate::encryption::{Crypter, FolderKeys, FolderTag};
use crate::loadsim::{LoadSimConfig, LoadSimHandle, LoadSimulator};

/// Note operations the editor and note list bind to
pub trait NoteStore: Send + Sync {
    /// All notes of the folder, in stored order
    fn get_all(&self) -> Result<Vec<Note>>;

    /// Persist a new note and assign its id. Fails if the note already has one.
    fn create(&self, note: &mut Note) -> Result<()>;

    /// Replace an existing note. Fails if its id is not in the folder.
    fn update(&self, note: &Note) -> Result<()>;
}

/// Repository bound to one folder of one database
pub struct NoteRepository {
    session: Mutex<Session>,
    crypter: Crypter,
    tag: FolderTag,
    simulation: Option<LoadSimHandle>,
    simulation_error: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for NoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteRepository")
            .field("tag", &self.tag)
            .field("load_simulation", &self.simulation.is_some())
            .finish_non_exhaustive()
    }
}

impl NoteRepository {
    /// Open (or create) the database at `path` and bind to `folder`
    pub fn open(path: impl AsRef<Path>, folder: &str, password: &str) -> Result<Self> {
        let db = Database::open(path)?;
        Self::with_database(&db, folder, password)
    }

    /// Bind to `folder` of an already opened database
    pub fn with_database(db: &Database, folder: &str, password: &str) -> Result<Self> {
        db.create_bucket_if_not_exists(DEFAULT_BUCKET_NAME)?;

        let keys = FolderKeys::derive(password, folder).map_err(StorageError::Configuration)?;
        let crypter = Crypter::from_key(&keys.key).map_err(StorageError::Configuration)?;

        log::debug!("Note repository bound to folder {}", keys.tag);

        Ok(Self {
            session: Mutex::new(db.connect()?),
            crypter,
            tag: keys.tag,
            simulation: None,
            simulation_error: Arc::new(Mutex::new(None)),
        })
    }

    /// Bind to `folder` and start a load simulator on the same database.
    ///
    /// The folder itself is always protected from the simulator, along with
    /// every name in `exceptions`. The simulator runs on `runtime`.
    pub fn with_load_simulation(
        db: &Database,
        folder: &str,
        password: &str,
        exceptions: &[String],
        config: LoadSimConfig,
        runtime: &Handle,
    ) -> Result<Self> {
        let mut repo = Self::with_database(db, folder, password)?;

        let mut protected = exceptions.to_vec();
        if !protected.iter().any(|name| name == folder) {
            protected.push(folder.to_string());
        }

        let last_error = Arc::clone(&repo.simulation_error);
        let simulator = LoadSimulator::new(db.clone(), &protected, config).with_error_sink(
            move |err| {
                log::warn!("Load simulator: {}", err);
                *last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
            },
        );

        repo.simulation = Some(simulator.start(runtime));
        Ok(repo)
    }

    /// Storage key of this repository's folder
    pub fn folder_tag(&self) -> &FolderTag {
        &self.tag
    }

    /// Most recent error reported by the load simulator, if any
    pub fn last_simulation_error(&self) -> Option<String> {
        self.simulation_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the load simulator started by [`NoteRepository::with_load_simulation`]
    pub fn stop_load_simulation(&self) {
        if let Some(handle) = &self.simulation {
            handle.stop();
        }
    }

    /// Replace the folder's entire note list without any existence checks
    pub fn update_all(&self, notes: &[Note]) -> Result<()> {
        self.session().update(|tx| {
            let bucket = tx.bucket(DEFAULT_BUCKET_NAME)?;
            self.write_folder(&bucket, notes)
        })
    }

    /// Encrypted folder value as stored, `None` when the folder is new
    pub fn raw_folder(&self) -> Result<Option<Vec<u8>>> {
        self.session().view(|tx| {
            let bucket = tx.bucket(DEFAULT_BUCKET_NAME)?;
            bucket.get(self.tag.as_bytes())
        })
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_folder(&self, bucket: &Bucket<'_>) -> Result<Vec<Note>> {
        match bucket.get(self.tag.as_bytes())? {
            Some(encrypted) if !encrypted.is_empty() => self.decode(&encrypted),
            _ => Ok(Vec::new()),
        }
    }

    fn write_folder(&self, bucket: &Bucket<'_>, notes: &[Note]) -> Result<()> {
        let encoded = serde_json::to_vec(notes)?;
        let encrypted = self.crypter.encrypt(&encoded)?;
        bucket.put(self.tag.as_bytes(), &encrypted)
    }

    fn decode(&self, encrypted: &[u8]) -> Result<Vec<Note>> {
        let decrypted = self.crypter.decrypt(encrypted)?;
        let notes = serde_json::from_slice(&decrypted)?;
        Ok(notes)
    }
}

impl NoteStore for NoteRepository {
    fn get_all(&self) -> Result<Vec<Note>> {
        self.session().view(|tx| {
            let bucket = tx.bucket(DEFAULT_BUCKET_NAME)?;
            self.read_folder(&bucket)
        })
    }

    fn create(&self, note: &mut Note) -> Result<()> {
        if note.has_id() {
            return Err(StorageError::IdAlreadyAssigned(note.id.clone()));
        }

        let id = Uuid::new_v4().to_string();
        self.session().update(|tx| {
            let bucket = tx.bucket(DEFAULT_BUCKET_NAME)?;
            let mut existing = self.read_folder(&bucket)?;

            let mut stored = note.clone();
            stored.id = id.clone();
            existing.push(stored);

            self.write_folder(&bucket, &existing)
        })?;

        log::debug!("Created note {} in folder {}", id, self.tag);
        note.id = id;
        Ok(())
    }

    fn update(&self, note: &Note) -> Result<()> {
        self.session().update(|tx| {
            let bucket = tx.bucket(DEFAULT_BUCKET_NAME)?;
            let mut existing = self.read_folder(&bucket)?;

            let slot = existing
                .iter_mut()
                .find(|stored| stored.id == note.id)
                .ok_or_else(|| StorageError::NoteNotFound(note.id.clone()))?;
            *slot = note.clone();

            self.write_folder(&bucket, &existing)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{decrypt, derive_folder_key, derive_folder_tag, encrypt};
    use crate::storage::ErrorKind;
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("soul.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_new_folder_is_empty() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "temp", "dummy key").unwrap();
        assert!(repo.get_all().unwrap().is_empty());
        assert!(repo.raw_folder().unwrap().is_none());
    }

    #[test]
    fn test_create_then_get_all() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();

        let mut note = Note::new("hello");
        repo.create(&mut note).unwrap();
        assert!(note.has_id());

        let notes = repo.get_all().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, note.id);
        assert_eq!(notes[0].text, "hello");
        assert_eq!(notes[0].version, 0);
    }

    #[test]
    fn test_diary_scenario() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();

        let mut note = Note::new("hello");
        repo.create(&mut note).unwrap();
        let id = note.id.clone();

        note.text = "hello world".to_string();
        repo.update(&note).unwrap();

        let notes = repo.get_all().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, id);
        assert_eq!(notes[0].text, "hello world");

        let wrong = NoteRepository::with_database(&db, "diary", "wrong").unwrap();
        let err = wrong.get_all().unwrap_err();
        assert!(matches!(err, StorageError::AuthenticationFailed));
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_create_rejects_assigned_id() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();

        let mut note = Note::new("hello");
        note.id = "already".to_string();
        let err = repo.create(&mut note).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(repo.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_update_unknown_id_leaves_folder_unchanged() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();
        repo.create(&mut Note::new("first")).unwrap();

        let before_notes = repo.get_all().unwrap();
        let before_raw = repo.raw_folder().unwrap();

        let ghost = Note {
            id: "does-not-exist".to_string(),
            version: 3,
            text: "ghost".to_string(),
        };
        let err = repo.update(&ghost).unwrap_err();
        assert!(matches!(err, StorageError::NoteNotFound(ref id) if id == "does-not-exist"));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(repo.get_all().unwrap(), before_notes);
        assert_eq!(repo.raw_folder().unwrap(), before_raw);
    }

    #[test]
    fn test_update_with_empty_id_is_not_found() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();
        let err = repo.update(&Note::new("no id")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_update_keeps_order_and_version() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();

        let mut first = Note::new("first");
        let mut second = Note::new("second");
        repo.create(&mut first).unwrap();
        repo.create(&mut second).unwrap();

        first.text = "first, edited".to_string();
        first.version = 7;
        repo.update(&first).unwrap();

        let notes = repo.get_all().unwrap();
        assert_eq!(notes, vec![first, second]);
    }

    #[test]
    fn test_update_all_replaces_everything() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "import", "pw").unwrap();
        repo.create(&mut Note::new("old")).unwrap();

        let imported = vec![
            Note {
                id: "a".to_string(),
                version: 1,
                text: "alpha".to_string(),
            },
            Note {
                id: "b".to_string(),
                version: 1,
                text: "beta".to_string(),
            },
        ];
        repo.update_all(&imported).unwrap();
        assert_eq!(repo.get_all().unwrap(), imported);

        repo.update_all(&[]).unwrap();
        assert!(repo.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_yields_same_notes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("soul.db");

        let written = {
            let repo = NoteRepository::open(&path, "diary", "secret123").unwrap();
            repo.create(&mut Note::new("one")).unwrap();
            repo.create(&mut Note::new("two")).unwrap();
            repo.get_all().unwrap()
        };

        let repo = NoteRepository::open(&path, "diary", "secret123").unwrap();
        assert_eq!(repo.get_all().unwrap(), written);
    }

    #[test]
    fn test_folders_sharing_password_are_isolated() {
        let (_dir, db) = temp_db();
        let repo1 = NoteRepository::with_database(&db, "folder1", "dummy key").unwrap();
        let repo2 = NoteRepository::with_database(&db, "folder2", "dummy key").unwrap();

        repo1.create(&mut Note::new("in folder 1")).unwrap();
        repo2.create(&mut Note::new("in folder 2")).unwrap();

        assert_eq!(repo1.folder_tag(), &derive_folder_tag("folder1"));
        let key1 = derive_folder_key("dummy key", "folder1").unwrap();
        let key2 = derive_folder_key("dummy key", "folder2").unwrap();

        let raw1 = repo1.raw_folder().unwrap().unwrap();
        let raw2 = repo2.raw_folder().unwrap().unwrap();
        assert!(decrypt(&key1, &raw1).is_ok());
        assert!(decrypt(&key2, &raw1).is_err());
        assert!(decrypt(&key2, &raw2).is_ok());
        assert!(decrypt(&key1, &raw2).is_err());

        assert_eq!(repo1.get_all().unwrap()[0].text, "in folder 1");
        assert_eq!(repo2.get_all().unwrap()[0].text, "in folder 2");
    }

    #[test]
    fn test_tampered_blob_is_authentication_failure() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();
        repo.create(&mut Note::new("hello")).unwrap();

        let mut raw = repo.raw_folder().unwrap().unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        let mut session = db.connect().unwrap();
        session
            .update(|tx| tx.bucket(DEFAULT_BUCKET_NAME)?.put(repo.folder_tag().as_bytes(), &raw))
            .unwrap();

        let err = repo.get_all().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_undecodable_blob_is_serialization_error() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "diary", "secret123").unwrap();

        let key = derive_folder_key("secret123", "diary").unwrap();
        let garbage = encrypt(&key, b"not a note list").unwrap();
        let mut session = db.connect().unwrap();
        session
            .update(|tx| tx.bucket(DEFAULT_BUCKET_NAME)?.put(repo.folder_tag().as_bytes(), &garbage))
            .unwrap();

        let err = repo.get_all().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let other = NoteRepository::with_database(&db, "other", "secret123").unwrap();
        assert!(other.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_creates_are_not_lost() {
        let (_dir, db) = temp_db();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let repo = NoteRepository::with_database(&db, "shared", "pw").unwrap();
                    for i in 0..10 {
                        repo.create(&mut Note::new(format!("worker {} note {}", worker, i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let repo = NoteRepository::with_database(&db, "shared", "pw").unwrap();
        let notes = repo.get_all().unwrap();
        assert_eq!(notes.len(), 40);

        let mut ids: Vec<_> = notes.iter().map(|n| n.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_load_simulation_protects_own_folder() {
        let (_dir, db) = temp_db();
        let config = LoadSimConfig {
            create_weight: 1,
            modify_weight: 3,
            max_pause_ms: 1,
            exception_variants: 5,
            ..LoadSimConfig::default()
        };
        let repo = NoteRepository::with_load_simulation(
            &db,
            "diary",
            "secret123",
            &[],
            config,
            &Handle::current(),
        )
        .unwrap();

        for i in 0..10 {
            let mut note = Note::new(format!("entry {}", i));
            repo.create(&mut note).unwrap();
            note.text.push_str(", revised");
            repo.update(&note).unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        repo.stop_load_simulation();
        repo.stop_load_simulation();

        let notes = repo.get_all().unwrap();
        assert_eq!(notes.len(), 10);
        assert!(notes.iter().all(|n| n.text.ends_with(", revised")));
        assert_eq!(repo.last_simulation_error(), None);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let (_dir, db) = temp_db();
        let repo = NoteRepository::with_database(&db, "shared", "pw").unwrap();
        let mut ids = Vec::new();
        for worker in 0..4 {
            let mut note = Note::new(format!("worker {} start", worker));
            repo.create(&mut note).unwrap();
            ids.push(note.id);
        }

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .enumerate()
            .map(|(worker, id)| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let repo = NoteRepository::with_database(&db, "shared", "pw").unwrap();
                    for round in 0..10 {
                        let note = Note {
                            id: id.clone(),
                            version: round,
                            text: format!("worker {} round {}", worker, round),
                        };
                        repo.update(&note).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let notes = repo.get_all().unwrap();
        assert_eq!(notes.len(), 4);
        for (worker, id) in ids.iter().enumerate() {
            let note = notes.iter().find(|n| &n.id == id).unwrap();
            assert_eq!(note.text, format!("worker {} round 9", worker));
            assert_eq!(note.version, 9);
        }
    }

    #[test]
    fn test_repository_is_usable_as_trait_object() {
        let (_dir, db) = temp_db();
        let store: Arc<dyn NoteStore> =
            Arc::new(NoteRepository::with_database(&db, "diary", "secret123").unwrap());

        let mut note = Note::new("through the trait");
        store.create(&mut note).unwrap();
        assert_eq!(store.get_all().unwrap(), vec![note]);
    }
}
