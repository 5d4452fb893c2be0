pub mod database;
mod errors;
mod models;
mod note_repository;

pub use database::{Bucket, Database, Session, Tx, DEFAULT_BUCKET_NAME};
pub use errors::{ErrorKind, Result, StorageError};
pub use models::*;
pub use note_repository::{NoteRepository, NoteStore};
