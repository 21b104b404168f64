//! Round settlement.
//!
//! When a round first becomes fully completed it emits a [`RoundSettled`]
//! event. Applying it counts one round off every frozen word the learner
//! owns, then moves each of the round's words one step on the round ladder.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{reviews, words};
use crate::error::StudyResult;
use crate::learning::{LadderRules, MasteryState};
use crate::models::{ReviewState, StudyRound};

#[derive(Debug, Clone, PartialEq)]
pub struct RoundSettled {
    pub user_id: Uuid,
    pub round_id: Uuid,
    pub word_ids: Vec<Uuid>,
    pub first_try_known: HashSet<Uuid>,
    pub settled_at: DateTime<Utc>,
}

impl RoundSettled {
    pub fn from_round(round: &StudyRound, settled_at: DateTime<Utc>) -> Self {
        Self {
            user_id: round.user_id,
            round_id: round.id,
            word_ids: round.word_ids.clone(),
            first_try_known: round.first_try_known_word_ids.iter().copied().collect(),
            settled_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    /// Frozen words that had one round counted off.
    pub thawed: usize,
    pub promoted: usize,
    /// Words sent back to the start of the ladder.
    pub reset: usize,
    pub mastered: usize,
}

/// Move one word on the round ladder and say how it moved.
pub fn settle_word(state: MasteryState, first_try_known: bool, rules: &LadderRules) -> (MasteryState, Step) {
    let next = state.advance(first_try_known, rules);
    let step = if next.is_mastered() && !state.is_mastered() {
        Step::Mastered
    } else if next.phase() > state.phase() {
        Step::Promoted
    } else if next.phase() < state.phase() {
        Step::Reset
    } else {
        Step::Unchanged
    };
    (next, step)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Unchanged,
    Promoted,
    Reset,
    Mastered,
}

/// Apply a settlement inside the caller's transaction.
///
/// Thawing happens first, so a word whose last frozen round is this one is
/// judged by this round's outcome. Words deleted since the round was built
/// have no state left to move and are skipped.
pub fn apply(conn: &Connection, event: &RoundSettled, rules: &LadderRules) -> StudyResult<SettlementReport> {
    let mut report = SettlementReport {
        thawed: reviews::thaw_frozen(conn, event.user_id)?,
        ..SettlementReport::default()
    };

    let live: HashSet<Uuid> = words::find_owned_words(conn, event.user_id, &event.word_ids)?
        .into_iter()
        .map(|w| w.id)
        .collect();
    let mut states = reviews::get_states(conn, event.user_id, &event.word_ids)?;
    for word_id in event.word_ids.iter().filter(|id| live.contains(*id)) {
        let mut state = states
            .remove(word_id)
            .unwrap_or_else(|| ReviewState::fresh(event.user_id, *word_id));
        let (next, step) = settle_word(state.mastery(), event.first_try_known.contains(word_id), rules);
        match step {
            Step::Unchanged => {}
            Step::Promoted => report.promoted += 1,
            Step::Reset => report.reset += 1,
            Step::Mastered => report.mastered += 1,
        }
        if next != state.mastery() {
            state.set_mastery(next);
            reviews::save_state(conn, &state)?;
        }
    }

    tracing::info!(
        "Settled round {}: {} thawed, {} promoted, {} reset, {} mastered",
        event.round_id,
        report.thawed,
        report.promoted,
        report.reset,
        report.mastered
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::LadderPhase;

    const RULES: LadderRules = LadderRules {
        required_streak: 1,
        first_freeze: 3,
        second_freeze: 6,
    };

    #[test]
    fn first_try_known_word_enters_cooldown() {
        let (next, step) = settle_word(MasteryState::default(), true, &RULES);
        assert_eq!(step, Step::Promoted);
        assert_eq!(
            next,
            MasteryState::Cooldown {
                phase: LadderPhase::ShortFreeze,
                rounds_left: 3
            }
        );
    }

    #[test]
    fn miss_after_thaw_resets() {
        let thawed = MasteryState::Cooldown {
            phase: LadderPhase::LongFreeze,
            rounds_left: 0,
        };
        assert_eq!(settle_word(thawed, false, &RULES).1, Step::Reset);
        assert_eq!(settle_word(thawed, true, &RULES).1, Step::Mastered);
    }

    #[test]
    fn frozen_word_ignores_the_round() {
        let frozen = MasteryState::Cooldown {
            phase: LadderPhase::ShortFreeze,
            rounds_left: 2,
        };
        assert_eq!(settle_word(frozen, false, &RULES), (frozen, Step::Unchanged));
    }
}
