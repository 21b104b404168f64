use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{format_datetime, json_column, parse_datetime, parse_uuid};
use crate::error::StudyResult;
use crate::models::{RoundStatus, SessionResult, SessionType, StudyRound, StudySession};

const ROUND_COLUMNS: &str = "id, user_id, name, word_ids, completed_word_ids, attempted_word_ids, \
     first_try_known_word_ids, status, created_at, updated_at, settled_at";

const SESSION_COLUMNS: &str =
    "id, user_id, round_id, session_type, word_ids, results, created_at, completed_at";

fn round_from_row(row: &Row) -> rusqlite::Result<StudyRound> {
    Ok(StudyRound {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        word_ids: json_column(row, 3)?,
        completed_word_ids: json_column(row, 4)?,
        attempted_word_ids: json_column(row, 5)?,
        first_try_known_word_ids: json_column(row, 6)?,
        status: RoundStatus::from_str(&row.get::<_, String>(7)?).unwrap_or(RoundStatus::Active),
        created_at: parse_datetime(row.get::<_, String>(8)?),
        updated_at: parse_datetime(row.get::<_, String>(9)?),
        settled_at: row.get::<_, Option<String>>(10)?.map(parse_datetime),
    })
}

fn session_from_row(row: &Row) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        round_id: parse_uuid(row.get::<_, String>(2)?),
        session_type: SessionType::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(SessionType::Normal),
        word_ids: json_column(row, 4)?,
        results: json_column(row, 5)?,
        created_at: parse_datetime(row.get::<_, String>(6)?),
        completed_at: row.get::<_, Option<String>>(7)?.map(parse_datetime),
    })
}

// ============================================================
// Rounds
// ============================================================

pub fn insert_round(conn: &Connection, round: &StudyRound) -> StudyResult<()> {
    conn.execute(
        "INSERT INTO study_rounds (id, user_id, name, word_ids, completed_word_ids,
             attempted_word_ids, first_try_known_word_ids, status, created_at, updated_at, settled_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            round.id.to_string(),
            round.user_id.to_string(),
            &round.name,
            serde_json::to_string(&round.word_ids)?,
            serde_json::to_string(&round.completed_word_ids)?,
            serde_json::to_string(&round.attempted_word_ids)?,
            serde_json::to_string(&round.first_try_known_word_ids)?,
            round.status.as_str(),
            format_datetime(round.created_at),
            format_datetime(round.updated_at),
            round.settled_at.map(format_datetime),
        ),
    )?;
    Ok(())
}

pub fn get_round(conn: &Connection, user_id: Uuid, id: Uuid) -> StudyResult<Option<StudyRound>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROUND_COLUMNS} FROM study_rounds WHERE id = ? AND user_id = ?"
    ))?;
    let mut rows = stmt.query([id.to_string(), user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(round_from_row(row)?))
    } else {
        Ok(None)
    }
}

pub fn list_rounds(conn: &Connection, user_id: Uuid) -> StudyResult<Vec<StudyRound>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROUND_COLUMNS} FROM study_rounds WHERE user_id = ? ORDER BY created_at DESC"
    ))?;
    let rounds = stmt
        .query_map([user_id.to_string()], round_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rounds)
}

/// Persist the mutable parts of a round. `word_ids` is never rewritten.
pub fn save_round_progress(conn: &Connection, round: &StudyRound) -> StudyResult<()> {
    conn.execute(
        "UPDATE study_rounds SET completed_word_ids = ?, attempted_word_ids = ?,
             first_try_known_word_ids = ?, status = ?, updated_at = ?, settled_at = ?
         WHERE id = ? AND user_id = ?",
        (
            serde_json::to_string(&round.completed_word_ids)?,
            serde_json::to_string(&round.attempted_word_ids)?,
            serde_json::to_string(&round.first_try_known_word_ids)?,
            round.status.as_str(),
            format_datetime(round.updated_at),
            round.settled_at.map(format_datetime),
            round.id.to_string(),
            round.user_id.to_string(),
        ),
    )?;
    Ok(())
}

// ============================================================
// Sessions
// ============================================================

pub fn insert_session(conn: &Connection, session: &StudySession) -> StudyResult<()> {
    conn.execute(
        "INSERT INTO study_sessions (id, user_id, round_id, session_type, word_ids, results, created_at, completed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            session.id.to_string(),
            session.user_id.to_string(),
            session.round_id.to_string(),
            session.session_type.as_str(),
            serde_json::to_string(&session.word_ids)?,
            serde_json::to_string(&session.results)?,
            format_datetime(session.created_at),
            session.completed_at.map(format_datetime),
        ),
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, user_id: Uuid, id: Uuid) -> StudyResult<Option<StudySession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ? AND user_id = ?"
    ))?;
    let mut rows = stmt.query([id.to_string(), user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(session_from_row(row)?))
    } else {
        Ok(None)
    }
}

pub fn find_open_session(
    conn: &Connection,
    round_id: Uuid,
    session_type: SessionType,
) -> StudyResult<Option<StudySession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM study_sessions
         WHERE round_id = ? AND session_type = ? AND completed_at IS NULL"
    ))?;
    let mut rows = stmt.query([round_id.to_string(), session_type.as_str().to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(session_from_row(row)?))
    } else {
        Ok(None)
    }
}

pub fn save_session_results(
    conn: &Connection,
    session_id: Uuid,
    results: &[SessionResult],
) -> StudyResult<()> {
    conn.execute(
        "UPDATE study_sessions SET results = ? WHERE id = ? AND completed_at IS NULL",
        (serde_json::to_string(results)?, session_id.to_string()),
    )?;
    Ok(())
}

/// Seal a session. Returns false when it was already completed.
pub fn complete_session(
    conn: &Connection,
    session_id: Uuid,
    results: &[SessionResult],
    at: DateTime<Utc>,
) -> StudyResult<bool> {
    let rows = conn.execute(
        "UPDATE study_sessions SET results = ?, completed_at = ?
         WHERE id = ? AND completed_at IS NULL",
        (
            serde_json::to_string(results)?,
            format_datetime(at),
            session_id.to_string(),
        ),
    )?;
    Ok(rows > 0)
}
