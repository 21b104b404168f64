//! The mastery ladder.
//!
//! A word climbs four rungs: it builds a streak of clean encounters, sits out a
//! short freeze and is verified, sits out a long freeze and is verified again,
//! and is then mastered for good. Any miss after the first freeze drops it all
//! the way back to the bottom.
//!
//! The same transition function serves two ladders that differ only in their
//! [`LadderRules`]: the per-encounter ladder used by the fixed-interval review
//! path, and the round ladder applied once per word when a round settles.

use serde::{Deserialize, Serialize};

use crate::models::{ReviewState, StudySettings};

/// Which verification a cooling-down word is waiting for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LadderPhase {
    /// Phase 1: verified after the first, shorter freeze.
    ShortFreeze,
    /// Phase 2: verified after the second, longer freeze.
    LongFreeze,
}

impl LadderPhase {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::ShortFreeze => 1,
            Self::LongFreeze => 2,
        }
    }
}

/// Where a word stands on the ladder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MasteryState {
    /// Phase 0, counting consecutive perfect encounters.
    Building { streak: u32 },
    /// Phase 1 or 2. While `rounds_left > 0` the word is frozen and outcomes
    /// are ignored; at zero the next outcome decides promotion or reset.
    Cooldown { phase: LadderPhase, rounds_left: u32 },
    Mastered,
}

/// The flat column form stored alongside a word's review counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryColumns {
    pub consecutive_perfect: u32,
    pub freeze_rounds: u32,
    pub is_mastered: bool,
    pub mastery_phase: u8,
}

/// Thresholds for one ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderRules {
    /// Perfect encounters in a row needed to leave phase 0.
    pub required_streak: u32,
    /// Freeze set on entering phase 1.
    pub first_freeze: u32,
    /// Freeze set on entering phase 2.
    pub second_freeze: u32,
}

impl LadderRules {
    /// Rules for the per-encounter ladder: two clean encounters, then 3 and 6.
    pub const PER_ENCOUNTER: Self = Self {
        required_streak: 2,
        first_freeze: 3,
        second_freeze: 6,
    };

    /// Rules for the round ladder, where one first-try-known round counts as
    /// one perfect encounter.
    pub fn for_rounds(settings: &StudySettings) -> Self {
        let first_freeze = settings.freeze_rounds.max(1);
        Self {
            required_streak: if settings.require_consecutive_known { 2 } else { 1 },
            first_freeze,
            second_freeze: first_freeze.saturating_mul(2),
        }
    }
}

impl Default for MasteryState {
    fn default() -> Self {
        Self::Building { streak: 0 }
    }
}

impl MasteryState {
    /// Read the stored columns. Inconsistent combinations are normalised:
    /// the mastered flag wins, and a freeze outside phases 1-2 is dropped.
    pub fn from_columns(columns: MasteryColumns) -> Self {
        if columns.is_mastered || columns.mastery_phase >= 3 {
            return Self::Mastered;
        }
        match columns.mastery_phase {
            1 => Self::Cooldown {
                phase: LadderPhase::ShortFreeze,
                rounds_left: columns.freeze_rounds,
            },
            2 => Self::Cooldown {
                phase: LadderPhase::LongFreeze,
                rounds_left: columns.freeze_rounds,
            },
            _ => Self::Building {
                streak: columns.consecutive_perfect,
            },
        }
    }

    pub fn columns(&self) -> MasteryColumns {
        match *self {
            Self::Building { streak } => MasteryColumns {
                consecutive_perfect: streak,
                freeze_rounds: 0,
                is_mastered: false,
                mastery_phase: 0,
            },
            Self::Cooldown { phase, rounds_left } => MasteryColumns {
                consecutive_perfect: 0,
                freeze_rounds: rounds_left,
                is_mastered: false,
                mastery_phase: phase.as_u8(),
            },
            Self::Mastered => MasteryColumns {
                consecutive_perfect: 0,
                freeze_rounds: 0,
                is_mastered: true,
                mastery_phase: 3,
            },
        }
    }

    pub fn phase(&self) -> u8 {
        self.columns().mastery_phase
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Cooldown { rounds_left, .. } if *rounds_left > 0)
    }

    pub fn is_mastered(&self) -> bool {
        matches!(self, Self::Mastered)
    }

    /// Apply one encounter outcome.
    ///
    /// `perfect` means the word was known cleanly: known without revealing the
    /// answer on the per-encounter ladder, known on the first try within the
    /// round on the round ladder.
    pub fn advance(self, perfect: bool, rules: &LadderRules) -> Self {
        match self {
            Self::Mastered => Self::Mastered,
            Self::Cooldown { rounds_left, .. } if rounds_left > 0 => self,
            Self::Building { streak } => {
                if !perfect {
                    return Self::Building { streak: 0 };
                }
                let streak = streak.saturating_add(1);
                if streak >= rules.required_streak {
                    Self::Cooldown {
                        phase: LadderPhase::ShortFreeze,
                        rounds_left: rules.first_freeze,
                    }
                } else {
                    Self::Building { streak }
                }
            }
            Self::Cooldown { phase, .. } => match (phase, perfect) {
                (_, false) => Self::Building { streak: 0 },
                (LadderPhase::ShortFreeze, true) => Self::Cooldown {
                    phase: LadderPhase::LongFreeze,
                    rounds_left: rules.second_freeze,
                },
                (LadderPhase::LongFreeze, true) => Self::Mastered,
            },
        }
    }

    /// Count down one settled round of freeze. No-op when not frozen.
    pub fn thaw(self) -> Self {
        match self {
            Self::Cooldown { phase, rounds_left } if rounds_left > 0 => Self::Cooldown {
                phase,
                rounds_left: rounds_left - 1,
            },
            other => other,
        }
    }
}

impl ReviewState {
    pub fn mastery(&self) -> MasteryState {
        MasteryState::from_columns(MasteryColumns {
            consecutive_perfect: self.consecutive_perfect,
            freeze_rounds: self.freeze_rounds,
            is_mastered: self.is_mastered,
            mastery_phase: self.mastery_phase,
        })
    }

    pub fn set_mastery(&mut self, state: MasteryState) {
        let columns = state.columns();
        self.consecutive_perfect = columns.consecutive_perfect;
        self.freeze_rounds = columns.freeze_rounds;
        self.is_mastered = columns.is_mastered;
        self.mastery_phase = columns.mastery_phase;
    }
}
