use anyhow::{Context, Result};
use rusqlite::Connection;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "study_rounds",
        sql: include_str!("migrations/002_study_rounds.sql"),
    },
    Migration {
        version: "003",
        name: "study_settings",
        sql: include_str!("migrations/003_study_settings.sql"),
    },
];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = get_applied_migrations(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.iter().any(|v| v == m.version))
        .collect();
    if pending.is_empty() {
        tracing::debug!("Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        apply_migration(conn, migration)?;
    }
    Ok(())
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

/// Run one migration and record it in the same transaction, so a failing
/// script leaves neither its partial changes nor a version row behind.
fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    tracing::info!("Applying migration {} ({})", migration.version, migration.name);

    let tx = conn
        .unchecked_transaction()
        .context("Failed to open migration transaction")?;
    tx.execute_batch(migration.sql)
        .with_context(|| format!("Migration {} ({}) failed", migration.version, migration.name))?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (
            migration.version,
            migration.name,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    tx.commit()
        .with_context(|| format!("Failed to commit migration {}", migration.version))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in [
            "words",
            "review_states",
            "review_logs",
            "study_rounds",
            "study_sessions",
            "study_settings",
        ] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }

        let versions = get_applied_migrations(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002", "003"]);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions = get_applied_migrations(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002", "003"]);
    }

    #[test]
    fn test_partially_migrated_db_catches_up() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "DROP TABLE study_settings; DELETE FROM schema_migrations WHERE version = '003';",
        )
        .unwrap();

        run_migrations(&conn).unwrap();
        assert!(table_exists(&conn, "study_settings"));
    }

    #[test]
    fn test_failed_migration_leaves_nothing_behind() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let broken = Migration {
            version: "999",
            name: "broken",
            sql: "CREATE TABLE half_done (id TEXT); THIS IS NOT SQL;",
        };
        assert!(apply_migration(&conn, &broken).is_err());
        assert!(!table_exists(&conn, "half_done"));
        assert!(!get_applied_migrations(&conn).unwrap().contains(&"999".to_string()));
    }

    #[test]
    fn test_only_one_open_session_per_round_and_type() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO study_rounds (id, user_id, name, word_ids, created_at, updated_at)
             VALUES ('r', 'u', 'round', '[]', 't', 't');
             INSERT INTO study_sessions (id, user_id, round_id, session_type, word_ids, created_at)
             VALUES ('s1', 'u', 'r', 'normal', '[]', 't');",
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO study_sessions (id, user_id, round_id, session_type, word_ids, created_at)
             VALUES ('s2', 'u', 'r', 'normal', '[]', 't')",
            [],
        );
        assert!(duplicate.is_err());

        conn.execute(
            "UPDATE study_sessions SET completed_at = 't' WHERE id = 's1'",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO study_sessions (id, user_id, round_id, session_type, word_ids, created_at)
             VALUES ('s2', 'u', 'r', 'normal', '[]', 't')",
            [],
        )
        .unwrap();
    }
}
