//! Activity heatmap aggregation.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityCell {
    pub date: NaiveDate,
    pub count: u32,
    /// 0 for none, then buckets of 1, 2-3, 4-6 and 7+.
    pub intensity: u8,
    /// False for padding cells that complete the first and last week.
    pub in_range: bool,
}

/// Monday-first weeks covering the trailing window that ends on `end`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityGrid {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total: u32,
    pub weeks: Vec<[ActivityCell; 7]>,
}

pub fn intensity_for(count: u32) -> u8 {
    match count {
        0 => 0,
        1 => 1,
        2..=3 => 2,
        4..=6 => 3,
        _ => 4,
    }
}

/// Longest window a grid covers, about ten years.
pub const MAX_ACTIVITY_DAYS: u32 = 3660;

/// Bucket `timestamps` into the `days` trailing days ending on `today`.
///
/// `days` is clamped to `1..=MAX_ACTIVITY_DAYS` and the window never reaches
/// past the calendar's first or last date. Events outside it are ignored.
pub fn build_activity_grid(timestamps: &[DateTime<Utc>], days: u32, today: NaiveDate) -> ActivityGrid {
    let days = days.clamp(1, MAX_ACTIVITY_DAYS);
    let start = today
        .checked_sub_signed(Duration::days(i64::from(days) - 1))
        .unwrap_or(NaiveDate::MIN);

    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for ts in timestamps {
        let date = ts.date_naive();
        if date >= start && date <= today {
            *counts.entry(date).or_default() += 1;
        }
    }

    let grid_start = start
        .checked_sub_signed(Duration::days(i64::from(start.weekday().num_days_from_monday())))
        .unwrap_or(start);
    let mut weeks = Vec::new();
    let mut total = 0;
    let mut week_start = grid_start;
    while week_start <= today {
        let week: [ActivityCell; 7] = std::array::from_fn(|offset| {
            let (date, in_range) = match week_start.checked_add_signed(Duration::days(offset as i64)) {
                Some(date) => (date, date >= start && date <= today),
                None => (NaiveDate::MAX, false),
            };
            let count = if in_range {
                counts.get(&date).copied().unwrap_or(0)
            } else {
                0
            };
            ActivityCell {
                date,
                count,
                intensity: intensity_for(count),
                in_range,
            }
        });
        total += week.iter().map(|cell| cell.count).sum::<u32>();
        weeks.push(week);
        match week_start.checked_add_signed(Duration::days(7)) {
            Some(next) => week_start = next,
            None => break,
        }
    }

    ActivityGrid {
        start,
        end: today,
        total,
        weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn intensity_buckets() {
        let buckets: Vec<u8> = [0, 1, 2, 3, 4, 6, 7, 40].iter().map(|c| intensity_for(*c)).collect();
        assert_eq!(buckets, vec![0, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn grid_is_made_of_whole_monday_weeks() {
        // 2024-05-15 is a Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let grid = build_activity_grid(&[], 10, today);
        assert_eq!(grid.start, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
        assert_eq!(grid.weeks.len(), 2);
        assert_eq!(grid.weeks[0][0].date.weekday(), chrono::Weekday::Mon);
        let in_range = grid.weeks.iter().flatten().filter(|c| c.in_range).count();
        assert_eq!(in_range, 10);
    }

    #[test]
    fn counts_land_on_their_day() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let mut events = vec![at(2024, 5, 15, 8); 5];
        events.push(at(2024, 5, 14, 23));
        events.push(at(2024, 4, 1, 12));
        let grid = build_activity_grid(&events, 7, today);
        assert_eq!(grid.total, 6);

        let cell = |date: NaiveDate| {
            *grid
                .weeks
                .iter()
                .flatten()
                .find(|c| c.date == date)
                .unwrap()
        };
        let wed = cell(today);
        assert_eq!((wed.count, wed.intensity), (5, 3));
        let tue = cell(NaiveDate::from_ymd_opt(2024, 5, 14).unwrap());
        assert_eq!((tue.count, tue.intensity), (1, 1));
    }

    #[test]
    fn same_input_gives_same_grid() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let events = vec![at(2024, 1, 3, 1), at(2024, 1, 3, 2)];
        assert_eq!(
            build_activity_grid(&events, 30, today),
            build_activity_grid(&events, 30, today)
        );
        assert_eq!(build_activity_grid(&events, 0, today).weeks.len(), 1);
    }

    #[test]
    fn oversized_windows_are_clamped() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let grid = build_activity_grid(&[at(2024, 5, 15, 8)], u32::MAX, today);
        let in_range = grid.weeks.iter().flatten().filter(|c| c.in_range).count();
        assert_eq!(in_range, MAX_ACTIVITY_DAYS as usize);
        assert_eq!(grid.total, 1);
    }

    #[test]
    fn windows_stop_at_the_ends_of_the_calendar() {
        let first = build_activity_grid(&[], 30, NaiveDate::MIN);
        assert_eq!(first.start, NaiveDate::MIN);
        assert_eq!(first.weeks.iter().flatten().filter(|c| c.in_range).count(), 1);

        let last = build_activity_grid(&[], 30, NaiveDate::MAX);
        assert_eq!(last.end, NaiveDate::MAX);
        assert_eq!(last.weeks.iter().flatten().filter(|c| c.in_range).count(), 30);
    }
}
