use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params_from_iter, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, grade_column, parse_datetime, parse_uuid, placeholders};
use crate::error::StudyResult;
use crate::models::{Grade, ReviewLog, ReviewState};

const STATE_COLUMNS: &str = "user_id, word_id, seen_count, lapse_count, consecutive_perfect, \
     freeze_rounds, is_mastered, mastery_phase, last_reviewed_at, due_at, stage";

fn state_from_row(row: &Row) -> rusqlite::Result<ReviewState> {
    Ok(ReviewState {
        user_id: parse_uuid(row.get::<_, String>(0)?),
        word_id: parse_uuid(row.get::<_, String>(1)?),
        seen_count: row.get(2)?,
        lapse_count: row.get(3)?,
        consecutive_perfect: row.get(4)?,
        freeze_rounds: row.get(5)?,
        is_mastered: row.get::<_, i32>(6)? != 0,
        mastery_phase: row.get(7)?,
        last_reviewed_at: row.get::<_, Option<String>>(8)?.map(parse_datetime),
        due_at: row.get::<_, Option<String>>(9)?.map(parse_datetime),
        stage: row.get(10)?,
    })
}

fn log_from_row(row: &Row) -> rusqlite::Result<ReviewLog> {
    Ok(ReviewLog {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        word_id: parse_uuid(row.get::<_, String>(2)?),
        grade: grade_column(row, 3)?,
        revealed_answer: row.get::<_, i32>(4)? != 0,
        reviewed_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

// ============================================================
// Review states
// ============================================================

pub fn get_state(conn: &Connection, user_id: Uuid, word_id: Uuid) -> StudyResult<Option<ReviewState>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STATE_COLUMNS} FROM review_states WHERE user_id = ? AND word_id = ?"
    ))?;
    let mut rows = stmt.query([user_id.to_string(), word_id.to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(state_from_row(row)?))
    } else {
        Ok(None)
    }
}

/// States for `word_ids`, keyed by word. Words never reviewed are absent.
pub fn get_states(
    conn: &Connection,
    user_id: Uuid,
    word_ids: &[Uuid],
) -> StudyResult<HashMap<Uuid, ReviewState>> {
    if word_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT {STATE_COLUMNS} FROM review_states WHERE user_id = ? AND word_id IN ({})",
        placeholders(word_ids.len())
    );
    let params =
        std::iter::once(user_id.to_string()).chain(word_ids.iter().map(|id| id.to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let states = stmt
        .query_map(params_from_iter(params), state_from_row)?
        .map(|r| r.map(|s| (s.word_id, s)))
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(states)
}

/// Insert or overwrite every column of a state.
pub fn save_state(conn: &Connection, state: &ReviewState) -> StudyResult<()> {
    conn.execute(
        "INSERT INTO review_states (user_id, word_id, seen_count, lapse_count, consecutive_perfect,
             freeze_rounds, is_mastered, mastery_phase, last_reviewed_at, due_at, stage)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id, word_id) DO UPDATE SET
             seen_count = excluded.seen_count,
             lapse_count = excluded.lapse_count,
             consecutive_perfect = excluded.consecutive_perfect,
             freeze_rounds = excluded.freeze_rounds,
             is_mastered = excluded.is_mastered,
             mastery_phase = excluded.mastery_phase,
             last_reviewed_at = excluded.last_reviewed_at,
             due_at = excluded.due_at,
             stage = excluded.stage",
        (
            state.user_id.to_string(),
            state.word_id.to_string(),
            state.seen_count,
            state.lapse_count,
            state.consecutive_perfect,
            state.freeze_rounds,
            if state.is_mastered { 1 } else { 0 },
            state.mastery_phase,
            state.last_reviewed_at.map(format_datetime),
            state.due_at.map(format_datetime),
            state.stage,
        ),
    )?;
    Ok(())
}

/// Create the state if needed and count one more encounter.
///
/// `seen_count` always goes up by one, `lapse_count` only for an unknown grade.
pub fn record_encounter(
    conn: &Connection,
    user_id: Uuid,
    word_id: Uuid,
    grade: Grade,
    at: DateTime<Utc>,
) -> StudyResult<()> {
    let lapse = if grade == Grade::Unknown { 1 } else { 0 };
    conn.execute(
        "INSERT INTO review_states (user_id, word_id, seen_count, lapse_count, last_reviewed_at)
         VALUES (?, ?, 1, ?, ?)
         ON CONFLICT (user_id, word_id) DO UPDATE SET
             seen_count = seen_count + 1,
             lapse_count = lapse_count + excluded.lapse_count,
             last_reviewed_at = excluded.last_reviewed_at",
        (
            user_id.to_string(),
            word_id.to_string(),
            lapse,
            format_datetime(at),
        ),
    )?;
    Ok(())
}

/// Count down one round of freeze on every frozen word the user owns.
pub fn thaw_frozen(conn: &Connection, user_id: Uuid) -> StudyResult<usize> {
    let rows = conn.execute(
        "UPDATE review_states SET freeze_rounds = freeze_rounds - 1
         WHERE user_id = ? AND freeze_rounds > 0",
        [user_id.to_string()],
    )?;
    Ok(rows)
}

/// States whose fixed-interval due date has passed, oldest first.
pub fn due_states(
    conn: &Connection,
    user_id: Uuid,
    now: DateTime<Utc>,
    limit: usize,
) -> StudyResult<Vec<ReviewState>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STATE_COLUMNS} FROM review_states
         WHERE user_id = ? AND due_at IS NOT NULL AND due_at <= ?
         ORDER BY due_at LIMIT ?"
    ))?;
    let states = stmt
        .query_map(
            (user_id.to_string(), format_datetime(now), limit as i64),
            state_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(states)
}

// ============================================================
// Review logs
// ============================================================

pub fn append_log(
    conn: &Connection,
    user_id: Uuid,
    word_id: Uuid,
    grade: Grade,
    revealed_answer: bool,
    at: DateTime<Utc>,
) -> StudyResult<ReviewLog> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO review_logs (id, user_id, word_id, grade, revealed_answer, reviewed_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            id.to_string(),
            user_id.to_string(),
            word_id.to_string(),
            grade.as_i64(),
            if revealed_answer { 1 } else { 0 },
            format_datetime(at),
        ),
    )?;

    Ok(ReviewLog {
        id,
        user_id,
        word_id,
        grade,
        revealed_answer,
        reviewed_at: at,
    })
}

/// Logs for one word, oldest first.
pub fn logs_for_word(conn: &Connection, user_id: Uuid, word_id: Uuid) -> StudyResult<Vec<ReviewLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, word_id, grade, revealed_answer, reviewed_at
         FROM review_logs WHERE user_id = ? AND word_id = ? ORDER BY reviewed_at, rowid",
    )?;
    let logs = stmt
        .query_map([user_id.to_string(), word_id.to_string()], log_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(logs)
}

/// The most recent grade for each of `word_ids` that has any log.
pub fn latest_grades(
    conn: &Connection,
    user_id: Uuid,
    word_ids: &[Uuid],
) -> StudyResult<HashMap<Uuid, Grade>> {
    if word_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT word_id, grade FROM review_logs
         WHERE user_id = ? AND word_id IN ({})
         ORDER BY reviewed_at, rowid",
        placeholders(word_ids.len())
    );
    let params =
        std::iter::once(user_id.to_string()).chain(word_ids.iter().map(|id| id.to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut latest = HashMap::new();
    while let Some(row) = rows.next()? {
        let word_id = parse_uuid(row.get::<_, String>(0)?);
        latest.insert(word_id, grade_column(row, 1)?);
    }
    Ok(latest)
}

/// Review timestamps for the user at or after `since`.
pub fn log_timestamps(
    conn: &Connection,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> StudyResult<Vec<DateTime<Utc>>> {
    let mut stmt = conn.prepare(
        "SELECT reviewed_at FROM review_logs WHERE user_id = ? AND reviewed_at >= ?
         ORDER BY reviewed_at",
    )?;
    let stamps = stmt
        .query_map((user_id.to_string(), format_datetime(since)), |row| {
            Ok(parse_datetime(row.get::<_, String>(0)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stamps)
}
