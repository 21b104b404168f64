use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vocabulary entry.
///
/// Words belong to a single user. Once a word has been reviewed only its
/// `note`, `category` and `is_priority` flag may change; the text and language
/// are fixed so that the review history keeps describing the same thing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    /// Language tag, e.g. `en` or `ja`.
    pub language: String,
    pub note: Option<String>,
    /// Priority words are offered before others in normal sessions.
    pub is_priority: bool,
    /// Manual grouping chosen by the learner.
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWordInput {
    pub text: String,
    pub language: String,
    pub note: Option<String>,
    #[serde(default)]
    pub is_priority: bool,
    pub category: Option<String>,
}

impl CreateWordInput {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            note: None,
            is_priority: false,
            category: None,
        }
    }
}

/// Input for editing a word. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWordInput {
    pub note: Option<String>,
    pub is_priority: Option<bool>,
    pub category: Option<String>,
}
