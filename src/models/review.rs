use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The learner's self-assessment for one encounter with a word.
///
/// Stored in review logs as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Unknown,
    Fuzzy,
    Known,
}

impl Grade {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Fuzzy => 1,
            Self::Known => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Fuzzy),
            2 => Some(Self::Known),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Fuzzy => "fuzzy",
            Self::Known => "known",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Self::Unknown),
            "fuzzy" => Some(Self::Fuzzy),
            "known" => Some(Self::Known),
            _ => None,
        }
    }
}

/// Memory counters for one word.
///
/// The flat mastery columns (`consecutive_perfect`, `freeze_rounds`,
/// `is_mastered`, `mastery_phase`) are only ever written through
/// [`crate::learning::MasteryState`], which keeps them mutually consistent.
/// `stage` and `due_at` belong to the fixed-interval review path and are
/// ignored by rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewState {
    pub user_id: Uuid,
    pub word_id: Uuid,
    pub seen_count: u32,
    pub lapse_count: u32,
    pub consecutive_perfect: u32,
    pub freeze_rounds: u32,
    pub is_mastered: bool,
    /// 0 building, 1 short-freeze verification, 2 long-freeze verification, 3 mastered.
    pub mastery_phase: u8,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub stage: u32,
}

impl ReviewState {
    /// A state for a word that has never been reviewed.
    pub fn fresh(user_id: Uuid, word_id: Uuid) -> Self {
        Self {
            user_id,
            word_id,
            seen_count: 0,
            lapse_count: 0,
            consecutive_perfect: 0,
            freeze_rounds: 0,
            is_mastered: false,
            mastery_phase: 0,
            last_reviewed_at: None,
            due_at: None,
            stage: 0,
        }
    }
}

/// An append-only record of one graded encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub word_id: Uuid,
    pub grade: Grade,
    /// Whether the learner looked at the answer before grading.
    pub revealed_answer: bool,
    pub reviewed_at: DateTime<Utc>,
}

/// Aggregate of a word's review logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WordStats {
    pub total: u32,
    pub known: u32,
    pub fuzzy: u32,
    pub unknown: u32,
    /// Known counts fully, fuzzy counts half. Zero when there are no logs.
    pub success_rate: f64,
}

impl WordStats {
    pub fn from_logs(logs: &[ReviewLog]) -> Self {
        let mut stats = Self::default();
        for log in logs {
            stats.total += 1;
            match log.grade {
                Grade::Known => stats.known += 1,
                Grade::Fuzzy => stats.fuzzy += 1,
                Grade::Unknown => stats.unknown += 1,
            }
        }
        if stats.total > 0 {
            stats.success_rate =
                (stats.known as f64 + stats.fuzzy as f64 * 0.5) / stats.total as f64;
        }
        stats
    }
}

/// Input for the independent fixed-interval review path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReviewInput {
    pub word_id: Uuid,
    pub grade: Grade,
    #[serde(default)]
    pub revealed_answer: bool,
}
