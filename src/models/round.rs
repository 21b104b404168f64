use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest number of words a single round may hold.
pub const MAX_ROUND_WORDS: usize = 500;

/// A fixed working set of words studied to completion across sessions.
///
/// `word_ids` never changes after creation. The three progress sets only grow
/// while the round is being studied (manual status edits are the one way to
/// take a word back out of `completed_word_ids`), and they are always subsets
/// of `word_ids`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyRound {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub word_ids: Vec<Uuid>,
    /// Words marked known at least once in this round.
    pub completed_word_ids: Vec<Uuid>,
    /// Words that have been presented at least once.
    pub attempted_word_ids: Vec<Uuid>,
    /// Words marked known on their first encounter in this round.
    pub first_try_known_word_ids: Vec<Uuid>,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When mastery was last settled for this round. Settlement runs at most once.
    pub settled_at: Option<DateTime<Utc>>,
}

impl StudyRound {
    pub fn contains(&self, word_id: Uuid) -> bool {
        self.word_ids.contains(&word_id)
    }

    /// True when every word in the round has been marked known at least once.
    ///
    /// Words in `removed` no longer exist and count as done.
    pub fn is_fully_completed(&self, removed: &HashSet<Uuid>) -> bool {
        let completed: HashSet<&Uuid> = self.completed_word_ids.iter().collect();
        self.word_ids
            .iter()
            .all(|id| completed.contains(id) || removed.contains(id))
    }

    /// Derive `status` from the completed set. Archived rounds stay archived.
    pub fn refresh_status(&mut self, removed: &HashSet<Uuid>) {
        if self.status == RoundStatus::Archived {
            return;
        }
        self.status = if self.is_fully_completed(removed) {
            RoundStatus::Completed
        } else {
            RoundStatus::Active
        };
    }

    pub fn mark_attempted(&mut self, word_id: Uuid) {
        insert_unique(&mut self.attempted_word_ids, word_id);
    }

    pub fn mark_completed(&mut self, word_id: Uuid) {
        insert_unique(&mut self.completed_word_ids, word_id);
    }

    pub fn mark_first_try_known(&mut self, word_id: Uuid) {
        insert_unique(&mut self.first_try_known_word_ids, word_id);
    }

    pub fn unmark_completed(&mut self, word_id: Uuid) {
        self.completed_word_ids.retain(|id| *id != word_id);
        self.first_try_known_word_ids.retain(|id| *id != word_id);
    }

    pub fn unmark_first_try_known(&mut self, word_id: Uuid) {
        self.first_try_known_word_ids.retain(|id| *id != word_id);
    }
}

fn insert_unique(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// The lifecycle state of a round.
///
/// - `Active`: Some words have not been marked known yet
/// - `Completed`: Every word has been marked known at least once
/// - `Archived`: Put away by the learner; overrides the other two
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Active,
    Completed,
    Archived,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Input for creating a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoundInput {
    pub name: String,
    pub word_ids: Vec<Uuid>,
}

/// Target of a manual status override for one word in a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundWordTarget {
    /// Known, and counted as known on the first try.
    FirstTryMastered,
    /// Known, but not on the first try.
    Mastered,
    Fuzzy,
    Unknown,
}

impl RoundWordTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTryMastered => "first_try_mastered",
            Self::Mastered => "mastered",
            Self::Fuzzy => "fuzzy",
            Self::Unknown => "unknown",
        }
    }
}

/// Per-round progress counters, using the in-round view of word status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundProgress {
    pub total: usize,
    pub completed: usize,
    pub attempted: usize,
    pub first_try_known: usize,
    pub new: usize,
    pub seen: usize,
    pub fuzzy: usize,
    pub unknown: usize,
    pub mastered: usize,
}
