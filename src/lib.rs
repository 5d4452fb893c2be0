//! Encrypted note folders on an embedded key-value store.
//!
//! Each folder's notes live in one authenticated-encrypted value whose key
//! is derived from the folder name. A [`SyncService`] flushes in-memory edits
//! to a [`NoteRepository`] on a timer, and the [`loadsim`] module generates
//! background write load against the same store.

pub mod config;
pub mod encryption;
pub mod loadsim;
pub mod notes;
pub mod storage;
pub mod sync;

pub use notes::NoteService;
pub use storage::{Database, Note, NoteRepository, NoteStore, StorageError};
pub use sync::{SyncConfig, SyncService};
