use serde::{Deserialize, Serialize};

/// Advisory note version. Stored and returned, never compared.
pub type Version = u32;

/// A single note inside a folder.
///
/// `id` is empty until the repository persists the note for the first time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub version: Version,
    pub text: String,
}

impl Note {
    /// A note that has not been persisted yet
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            version: 0,
            text: text.into(),
        }
    }

    /// Whether the repository has assigned an id to this note
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// First line of the text, or "Untitled" for an empty note
    pub fn title(&self) -> &str {
        if self.text.is_empty() {
            return "Untitled";
        }
        self.text.split('\n').next().unwrap_or_default()
    }
}
