//! Memory confidence scoring.
//!
//! A weighted heuristic over a word's review history and fixed-interval
//! state. It is total: any input, including an empty history or timestamps
//! in the future, yields a score in `0..=100`.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Grade, ReviewLog};

const SUCCESS_WEIGHT: f64 = 0.48;
const STAGE_WEIGHT: f64 = 0.28;
const CONSISTENCY_WEIGHT: f64 = 0.14;
const SEEN_WEIGHT: f64 = 0.10;
const OVERDUE_PENALTY: f64 = 0.16;
const LAPSE_PENALTY: f64 = 0.14;

const CONSISTENCY_WINDOW_DAYS: i64 = 30;
const CONSISTENCY_TARGET_DAYS: f64 = 14.0;
const STAGE_CEILING: f64 = 6.0;
const SEEN_CEILING: f64 = 25.0;
const OVERDUE_CEILING_DAYS: f64 = 7.0;
const LAPSE_CEILING: f64 = 12.0;

const EMPTY_HISTORY_SCORE: u8 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoryLevel {
    S,
    A,
    B,
    C,
    D,
}

impl MemoryLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => Self::S,
            70..=84 => Self::A,
            55..=69 => Self::B,
            40..=54 => Self::C,
            _ => Self::D,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::S => "Firmly remembered",
            Self::A => "Well remembered",
            Self::B => "Mostly remembered",
            Self::C => "Still shaky",
            Self::D => "Needs more practice",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRating {
    pub level: MemoryLevel,
    pub score: u8,
    pub summary: String,
}

/// Everything the rating looks at.
#[derive(Debug, Clone, Copy)]
pub struct RatingInput<'a> {
    pub stage: u32,
    pub due_at: Option<DateTime<Utc>>,
    pub lapse_count: u32,
    pub seen_count: u32,
    pub logs: &'a [ReviewLog],
    pub now: DateTime<Utc>,
}

pub fn rate_memory(input: RatingInput<'_>) -> MemoryRating {
    if input.logs.is_empty() {
        return MemoryRating {
            level: MemoryLevel::D,
            score: EMPTY_HISTORY_SCORE,
            summary: "No reviews yet".to_string(),
        };
    }

    let total = input.logs.len() as f64;
    let known = count_grade(input.logs, Grade::Known);
    let fuzzy = count_grade(input.logs, Grade::Fuzzy);
    let success_rate = (known + fuzzy * 0.5) / total;

    let window_start = input.now - Duration::days(CONSISTENCY_WINDOW_DAYS);
    let active_days: HashSet<_> = input
        .logs
        .iter()
        .filter(|log| log.reviewed_at >= window_start && log.reviewed_at <= input.now)
        .map(|log| log.reviewed_at.date_naive())
        .collect();
    let consistency = clamp01(active_days.len() as f64 / CONSISTENCY_TARGET_DAYS);

    let stage_norm = clamp01(input.stage as f64 / STAGE_CEILING);
    let seen_norm = clamp01(input.seen_count as f64 / SEEN_CEILING);

    let days_overdue = input
        .due_at
        .map(|due| (input.now - due).num_seconds() as f64 / 86_400.0)
        .unwrap_or(0.0)
        .max(0.0);
    let overdue_penalty = clamp01(days_overdue / OVERDUE_CEILING_DAYS) * OVERDUE_PENALTY;
    let lapse_penalty = clamp01(input.lapse_count as f64 / LAPSE_CEILING) * LAPSE_PENALTY;

    let raw = success_rate * SUCCESS_WEIGHT
        + stage_norm * STAGE_WEIGHT
        + consistency * CONSISTENCY_WEIGHT
        + seen_norm * SEEN_WEIGHT
        - overdue_penalty
        - lapse_penalty;
    let score = (clamp01(raw) * 100.0).round() as u8;
    let level = MemoryLevel::from_score(score);

    MemoryRating {
        level,
        score,
        summary: level.summary().to_string(),
    }
}

fn count_grade(logs: &[ReviewLog], grade: Grade) -> f64 {
    logs.iter().filter(|log| log.grade == grade).count() as f64
}

fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn log(grade: Grade, days_ago: i64) -> ReviewLog {
        ReviewLog {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            word_id: Uuid::nil(),
            grade,
            revealed_answer: false,
            reviewed_at: now() - Duration::days(days_ago),
        }
    }

    fn input(logs: &[ReviewLog]) -> RatingInput<'_> {
        RatingInput {
            stage: 0,
            due_at: None,
            lapse_count: 0,
            seen_count: 0,
            logs,
            now: now(),
        }
    }

    #[test]
    fn empty_history_is_d20() {
        let rating = rate_memory(input(&[]));
        assert_eq!(rating.level, MemoryLevel::D);
        assert_eq!(rating.score, 20);
    }

    #[test]
    fn strong_history_reaches_s() {
        let logs: Vec<_> = (0..14).map(|d| log(Grade::Known, d)).collect();
        let rating = rate_memory(RatingInput {
            stage: 6,
            seen_count: 25,
            due_at: Some(now() + Duration::days(3)),
            ..input(&logs)
        });
        assert_eq!(rating.score, 100);
        assert_eq!(rating.level, MemoryLevel::S);
    }

    #[test]
    fn weighted_sum_matches_hand_calculation() {
        // success (1 + 0.5) / 2 = 0.75, two active days of 14, stage 3 of 6, seen 5 of 25
        let logs = vec![log(Grade::Known, 1), log(Grade::Fuzzy, 2)];
        let rating = rate_memory(RatingInput {
            stage: 3,
            seen_count: 5,
            ..input(&logs)
        });
        let expected: f64 = 0.75 * 0.48 + 0.5 * 0.28 + (2.0 / 14.0) * 0.14 + 0.2 * 0.10;
        assert_eq!(rating.score, (expected * 100.0).round() as u8);
        assert_eq!(rating.score, 54);
        assert_eq!(rating.level, MemoryLevel::C);
    }

    #[test]
    fn penalties_can_floor_the_score() {
        let logs = vec![log(Grade::Unknown, 40)];
        let rating = rate_memory(RatingInput {
            lapse_count: 50,
            due_at: Some(now() - Duration::days(30)),
            ..input(&logs)
        });
        assert_eq!(rating.score, 0);
        assert_eq!(rating.level, MemoryLevel::D);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(MemoryLevel::from_score(85), MemoryLevel::S);
        assert_eq!(MemoryLevel::from_score(84), MemoryLevel::A);
        assert_eq!(MemoryLevel::from_score(70), MemoryLevel::A);
        assert_eq!(MemoryLevel::from_score(55), MemoryLevel::B);
        assert_eq!(MemoryLevel::from_score(40), MemoryLevel::C);
        assert_eq!(MemoryLevel::from_score(39), MemoryLevel::D);
    }
}
