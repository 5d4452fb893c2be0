use std::sync::Arc;

use crate::storage::{Note, NoteStore, Result};

/// The note list the editor works on.
///
/// Edits through [`NoteService::note_mut`] stay in memory until they are
/// written back with [`NoteService::update`] or picked up by a sync pass
/// reading [`NoteService::snapshot`].
pub struct NoteService {
    store: Arc<dyn NoteStore>,
    notes: Vec<Note>,
}

impl std::fmt::Debug for NoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteService")
            .field("notes", &self.notes.len())
            .finish_non_exhaustive()
    }
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self {
            store,
            notes: Vec::new(),
        }
    }

    /// Replace the in-memory list with everything the store holds.
    ///
    /// On error the current list is kept.
    pub fn load_all(&mut self) -> Result<()> {
        self.notes = self.store.get_all()?;
        log::debug!("Loaded {} note(s)", self.notes.len());
        Ok(())
    }

    /// Persist a new empty note and append it to the list
    pub fn create(&mut self) -> Result<&mut Note> {
        let mut note = Note::default();
        self.store.create(&mut note)?;

        self.notes.push(note);
        let last = self.notes.len() - 1;
        Ok(&mut self.notes[last])
    }

    /// Write `note` back to the store
    pub fn update(&self, note: &Note) -> Result<()> {
        self.store.update(note)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == id)
    }

    /// Copy of the current list, for sync passes
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, NoteRepository, StorageError};
    use crate::sync::SyncService;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Store that keeps notes in a vector and can be told to fail
    #[derive(Default)]
    struct MockStore {
        notes: Mutex<Vec<Note>>,
        failing: Mutex<bool>,
    }

    impl NoteStore for MockStore {
        fn get_all(&self) -> Result<Vec<Note>> {
            if *self.failing.lock().unwrap() {
                return Err(StorageError::AuthenticationFailed);
            }
            Ok(self.notes.lock().unwrap().clone())
        }

        fn create(&self, note: &mut Note) -> Result<()> {
            let mut notes = self.notes.lock().unwrap();
            note.id = format!("id-{}", notes.len());
            notes.push(note.clone());
            Ok(())
        }

        fn update(&self, note: &Note) -> Result<()> {
            let mut notes = self.notes.lock().unwrap();
            let slot = notes
                .iter_mut()
                .find(|n| n.id == note.id)
                .ok_or_else(|| StorageError::NoteNotFound(note.id.clone()))?;
            *slot = note.clone();
            Ok(())
        }
    }

    #[test]
    fn test_create_appends_empty_note() {
        let store = Arc::new(MockStore::default());
        let mut service = NoteService::new(store.clone());

        let note = service.create().unwrap();
        assert_eq!(note.id, "id-0");
        assert_eq!(note.title(), "Untitled");

        assert_eq!(service.notes().len(), 1);
        assert_eq!(store.notes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_edit_then_update() {
        let store = Arc::new(MockStore::default());
        let mut service = NoteService::new(store.clone());
        let id = service.create().unwrap().id.clone();

        service.note_mut(&id).unwrap().text = "Shopping\nbread".to_string();
        assert!(store.notes.lock().unwrap()[0].text.is_empty());

        let note = service.notes()[0].clone();
        service.update(&note).unwrap();
        assert_eq!(store.notes.lock().unwrap()[0].title(), "Shopping");

        assert!(service.note_mut("missing").is_none());
    }

    #[test]
    fn test_failed_load_keeps_list() {
        let store = Arc::new(MockStore::default());
        let mut service = NoteService::new(store.clone());
        service.create().unwrap();

        *store.failing.lock().unwrap() = true;
        assert!(service.load_all().is_err());
        assert_eq!(service.notes().len(), 1);

        *store.failing.lock().unwrap() = false;
        service.load_all().unwrap();
        assert_eq!(service.snapshot(), *store.notes.lock().unwrap());
    }

    #[tokio::test]
    async fn test_edits_reach_repository_through_sync() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("soul.db")).unwrap();
        let repo = Arc::new(NoteRepository::with_database(&db, "diary", "secret123").unwrap());

        let service = Arc::new(Mutex::new(NoteService::new(repo.clone())));
        let id = service.lock().unwrap().create().unwrap().id.clone();

        let source = Arc::clone(&service);
        let target = Arc::clone(&repo);
        let sync = SyncService::new(
            move || Ok(source.lock().unwrap().snapshot()),
            move |note: &Note| Ok(target.update(note)?),
            |err| panic!("unexpected sync error: {}", err),
            Duration::from_millis(10),
        );
        sync.start().unwrap();

        service.lock().unwrap().note_mut(&id).unwrap().text = "Dear diary".to_string();

        let mut stored = String::new();
        for _ in 0..200 {
            stored = repo.get_all().unwrap()[0].text.clone();
            if stored == "Dear diary" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stored, "Dear diary");

        sync.stop();
        sync.stopped().await;
    }
}
