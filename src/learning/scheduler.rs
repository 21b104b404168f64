//! Fixed-interval review scheduling.
//!
//! A graduated-interval model for the "due now" review surface. It shares
//! nothing with rounds except the review log format.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Grade;

/// Interval in days for each stage.
pub const STAGE_INTERVAL_DAYS: [i64; 7] = [0, 1, 2, 4, 7, 15, 30];

pub const MAX_STAGE: u32 = (STAGE_INTERVAL_DAYS.len() - 1) as u32;

/// Retry delay after a fuzzy answer.
pub const FUZZY_RETRY_HOURS: i64 = 12;

/// Retry delay after a miss.
pub const UNKNOWN_RETRY_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewPlan {
    pub next_stage: u32,
    pub due_at: DateTime<Utc>,
    pub lapse_increment: u32,
}

/// Plan the next review of a word at `current_stage` graded `grade` at `now`.
pub fn plan_next_review(current_stage: u32, grade: Grade, now: DateTime<Utc>) -> ReviewPlan {
    let stage = current_stage.min(MAX_STAGE);
    match grade {
        Grade::Known => {
            let next_stage = (stage + 1).min(MAX_STAGE);
            ReviewPlan {
                next_stage,
                due_at: now + Duration::days(STAGE_INTERVAL_DAYS[next_stage as usize]),
                lapse_increment: 0,
            }
        }
        Grade::Fuzzy => ReviewPlan {
            next_stage: stage.max(1),
            due_at: now + Duration::hours(FUZZY_RETRY_HOURS),
            lapse_increment: 0,
        },
        Grade::Unknown => ReviewPlan {
            next_stage: 0,
            due_at: now + Duration::minutes(UNKNOWN_RETRY_MINUTES),
            lapse_increment: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn known_advances_one_stage() {
        let plan = plan_next_review(2, Grade::Known, t0());
        assert_eq!(plan.next_stage, 3);
        assert_eq!(plan.due_at, t0() + Duration::days(4));
        assert_eq!(plan.lapse_increment, 0);
    }

    #[test]
    fn unknown_resets_and_counts_a_lapse() {
        let plan = plan_next_review(2, Grade::Unknown, t0());
        assert_eq!(plan.next_stage, 0);
        assert_eq!(plan.due_at, t0() + Duration::minutes(10));
        assert_eq!(plan.lapse_increment, 1);
    }

    #[test]
    fn fuzzy_keeps_stage_but_floors_at_one() {
        assert_eq!(plan_next_review(0, Grade::Fuzzy, t0()).next_stage, 1);
        let plan = plan_next_review(4, Grade::Fuzzy, t0());
        assert_eq!(plan.next_stage, 4);
        assert_eq!(plan.due_at, t0() + Duration::hours(12));
    }

    #[test]
    fn stage_is_capped_and_clamped() {
        let plan = plan_next_review(MAX_STAGE, Grade::Known, t0());
        assert_eq!(plan.next_stage, MAX_STAGE);
        assert_eq!(plan.due_at, t0() + Duration::days(30));

        let plan = plan_next_review(99, Grade::Fuzzy, t0());
        assert_eq!(plan.next_stage, MAX_STAGE);
    }
}
