use serde::{Deserialize, Serialize};

/// Codex tab an entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodexCategory {
    Person,
    Place,
    Lore,
}

impl CodexCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Place => "place",
            Self::Lore => "lore",
        }
    }
}

/// A lore record, visible once its id is unlocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodexEntry {
    pub id: String,
    pub title: String,
    pub category: CodexCategory,
    pub content: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CodexEntry {
    /// First paragraph, used for speaker tooltips and image prompts.
    pub fn summary(&self) -> Option<&str> {
        self.content.first().map(String::as_str)
    }
}
