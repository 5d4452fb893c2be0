//! In-memory note collection backed by a [`NoteStore`](crate::storage::NoteStore)

mod service;

pub use service::NoteService;
