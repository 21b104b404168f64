use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::review::Grade;

/// One bounded practice batch drawn from a round.
///
/// The order of `word_ids` is fixed at creation and callers must replay it
/// exactly; saved progress is checked index by index against it. Once
/// `completed_at` is set the session never changes again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub round_id: Uuid,
    pub session_type: SessionType,
    pub word_ids: Vec<Uuid>,
    /// Outcomes in presentation order. Append-only.
    pub results: Vec<SessionResult>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StudySession {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// The kind of batch.
///
/// - `Normal`: First encounters with words not yet attempted in the round
/// - `Extra`: Re-practice of attempted words still graded unknown or fuzzy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Normal,
    Extra,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Extra => "extra",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "extra" => Some(Self::Extra),
            _ => None,
        }
    }
}

/// The outcome recorded for one word of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionResult {
    pub word_id: Uuid,
    pub outcome: Grade,
}

impl SessionResult {
    pub fn new(word_id: Uuid, outcome: Grade) -> Self {
        Self { word_id, outcome }
    }
}
