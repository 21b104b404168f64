use chrono::Utc;
use rusqlite::{params_from_iter, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid, placeholders};
use crate::error::StudyResult;
use crate::models::{CreateWordInput, UpdateWordInput, Word};

const WORD_COLUMNS: &str = "id, user_id, text, language, note, is_priority, category, created_at";

fn word_from_row(row: &Row) -> rusqlite::Result<Word> {
    Ok(Word {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        text: row.get(2)?,
        language: row.get(3)?,
        note: row.get(4)?,
        is_priority: row.get::<_, i32>(5)? != 0,
        category: row.get(6)?,
        created_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

pub fn insert_word(conn: &Connection, user_id: Uuid, input: CreateWordInput) -> StudyResult<Word> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO words (id, user_id, text, language, note, is_priority, category, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            id.to_string(),
            user_id.to_string(),
            &input.text,
            &input.language,
            &input.note,
            if input.is_priority { 1 } else { 0 },
            &input.category,
            format_datetime(now),
        ),
    )?;

    Ok(Word {
        id,
        user_id,
        text: input.text,
        language: input.language,
        note: input.note,
        is_priority: input.is_priority,
        category: input.category,
        created_at: now,
    })
}

pub fn get_word(conn: &Connection, user_id: Uuid, id: Uuid) -> StudyResult<Option<Word>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words WHERE id = ? AND user_id = ?"
    ))?;
    let mut rows = stmt.query([id.to_string(), user_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(word_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn list_words(conn: &Connection, user_id: Uuid) -> StudyResult<Vec<Word>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words WHERE user_id = ? ORDER BY created_at, rowid"
    ))?;
    let words = stmt
        .query_map([user_id.to_string()], word_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(words)
}

/// The subset of `ids` that exist and belong to `user_id`, in no particular order.
pub fn find_owned_words(conn: &Connection, user_id: Uuid, ids: &[Uuid]) -> StudyResult<Vec<Word>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {WORD_COLUMNS} FROM words WHERE user_id = ? AND id IN ({})",
        placeholders(ids.len())
    );
    let params = std::iter::once(user_id.to_string()).chain(ids.iter().map(|id| id.to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let words = stmt
        .query_map(params_from_iter(params), word_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(words)
}

pub fn update_word(
    conn: &Connection,
    user_id: Uuid,
    id: Uuid,
    input: UpdateWordInput,
) -> StudyResult<Option<Word>> {
    let Some(existing) = get_word(conn, user_id, id)? else {
        return Ok(None);
    };

    let note = input.note.or(existing.note);
    let category = input.category.or(existing.category);
    let is_priority = input.is_priority.unwrap_or(existing.is_priority);

    conn.execute(
        "UPDATE words SET note = ?, category = ?, is_priority = ? WHERE id = ? AND user_id = ?",
        (
            &note,
            &category,
            if is_priority { 1 } else { 0 },
            id.to_string(),
            user_id.to_string(),
        ),
    )?;

    Ok(Some(Word {
        note,
        category,
        is_priority,
        ..existing
    }))
}

pub fn delete_word(conn: &Connection, user_id: Uuid, id: Uuid) -> StudyResult<bool> {
    let rows = conn.execute(
        "DELETE FROM words WHERE id = ? AND user_id = ?",
        [id.to_string(), user_id.to_string()],
    )?;
    Ok(rows > 0)
}
