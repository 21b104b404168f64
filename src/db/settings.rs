use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::error::StudyResult;
use crate::models::StudySettings;

fn settings_from_row(row: &Row) -> rusqlite::Result<StudySettings> {
    Ok(StudySettings {
        user_id: parse_uuid(row.get::<_, String>(0)?),
        session_size: row.get(1)?,
        freeze_rounds: row.get(2)?,
        auto_play_audio: row.get::<_, i32>(3)? != 0,
        require_consecutive_known: row.get::<_, i32>(4)? != 0,
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn select_settings(conn: &Connection, user_id: Uuid) -> StudyResult<Option<StudySettings>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, session_size, freeze_rounds, auto_play_audio, require_consecutive_known, updated_at
         FROM study_settings WHERE user_id = ?",
    )?;
    let mut rows = stmt.query([user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        Ok(Some(settings_from_row(row)?))
    } else {
        Ok(None)
    }
}

/// Read the user's settings, creating the default record on first access.
pub fn get_or_create_settings(conn: &Connection, user_id: Uuid) -> StudyResult<StudySettings> {
    if let Some(existing) = select_settings(conn, user_id)? {
        return Ok(existing);
    }

    let defaults = StudySettings::defaults(user_id);
    save_settings(conn, &defaults)?;
    tracing::debug!("Created default study settings for user {}", user_id);
    Ok(defaults)
}

pub fn save_settings(conn: &Connection, settings: &StudySettings) -> StudyResult<()> {
    conn.execute(
        "INSERT INTO study_settings (user_id, session_size, freeze_rounds, auto_play_audio,
             require_consecutive_known, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id) DO UPDATE SET
             session_size = excluded.session_size,
             freeze_rounds = excluded.freeze_rounds,
             auto_play_audio = excluded.auto_play_audio,
             require_consecutive_known = excluded.require_consecutive_known,
             updated_at = excluded.updated_at",
        (
            settings.user_id.to_string(),
            settings.session_size,
            settings.freeze_rounds,
            if settings.auto_play_audio { 1 } else { 0 },
            if settings.require_consecutive_known { 1 } else { 0 },
            format_datetime(settings.updated_at),
        ),
    )?;
    Ok(())
}
