//! Display status for a word.

use serde::{Deserialize, Serialize};

use crate::models::{Grade, ReviewState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
    New,
    Seen,
    Fuzzy,
    Unknown,
    Mastered,
    Frozen,
}

impl WordStatus {
    /// Statuses that qualify an attempted word for extra practice.
    pub fn needs_practice(&self) -> bool {
        matches!(self, Self::Unknown | Self::Fuzzy)
    }
}

/// Status as shown in word lists: frozen words report `Frozen`.
pub fn derive_status(state: Option<&ReviewState>, latest: Option<Grade>) -> WordStatus {
    derive(state, latest, false)
}

/// Status as seen from inside a round: a frozen word reports what its latest
/// grade says, so in-round counters and practice pools track the round's own
/// outcomes.
pub fn derive_round_status(state: Option<&ReviewState>, latest: Option<Grade>) -> WordStatus {
    derive(state, latest, true)
}

fn derive(state: Option<&ReviewState>, latest: Option<Grade>, see_through_freeze: bool) -> WordStatus {
    let Some(state) = state else {
        return WordStatus::New;
    };
    if state.seen_count == 0 {
        return WordStatus::New;
    }
    if state.freeze_rounds > 0 {
        return if see_through_freeze {
            from_grade(latest)
        } else {
            WordStatus::Frozen
        };
    }
    if state.is_mastered {
        return WordStatus::Mastered;
    }
    from_grade(latest)
}

fn from_grade(latest: Option<Grade>) -> WordStatus {
    match latest {
        Some(Grade::Unknown) => WordStatus::Unknown,
        Some(Grade::Fuzzy) => WordStatus::Fuzzy,
        _ => WordStatus::Seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn state(seen: u32, freeze: u32, mastered: bool) -> ReviewState {
        ReviewState {
            seen_count: seen,
            freeze_rounds: freeze,
            is_mastered: mastered,
            mastery_phase: if mastered { 3 } else if freeze > 0 { 1 } else { 0 },
            ..ReviewState::fresh(Uuid::nil(), Uuid::nil())
        }
    }

    #[test]
    fn unseen_words_are_new() {
        assert_eq!(derive_status(None, Some(Grade::Unknown)), WordStatus::New);
        assert_eq!(derive_status(Some(&state(0, 0, false)), None), WordStatus::New);
    }

    #[test]
    fn frozen_unless_looking_from_inside_a_round() {
        let s = state(3, 2, false);
        assert_eq!(derive_status(Some(&s), Some(Grade::Unknown)), WordStatus::Frozen);
        assert_eq!(derive_round_status(Some(&s), Some(Grade::Unknown)), WordStatus::Unknown);
        assert_eq!(derive_round_status(Some(&s), Some(Grade::Fuzzy)), WordStatus::Fuzzy);
        assert_eq!(derive_round_status(Some(&s), Some(Grade::Known)), WordStatus::Seen);
    }

    #[test]
    fn mastered_then_latest_grade() {
        assert_eq!(derive_status(Some(&state(5, 0, true)), Some(Grade::Unknown)), WordStatus::Mastered);
        assert_eq!(derive_status(Some(&state(1, 0, false)), Some(Grade::Fuzzy)), WordStatus::Fuzzy);
        assert_eq!(derive_status(Some(&state(1, 0, false)), None), WordStatus::Seen);
    }
}
