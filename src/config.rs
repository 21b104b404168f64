//! Process configuration for the binary.
//!
//! Study preferences are per user and live in the database
//! ([`crate::models::StudySettings`]). This module only covers where the
//! database is and who the CLI acts as.

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

pub const DB_ENV: &str = "WORDLADDER_DB";
pub const USER_ENV: &str = "WORDLADDER_USER";
pub const DEFAULT_LOG_FILTER: &str = "wordladder=info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// The learner the CLI acts for. The nil id is the single local learner.
    pub user_id: Uuid,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match get(DB_ENV) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };
        let user_id = match get(USER_ENV) {
            Some(raw) => Uuid::parse_str(raw.trim())
                .with_context(|| format!("{USER_ENV} is not a valid UUID: {raw}"))?,
            None => Uuid::nil(),
        };

        Ok(Self { db_path, user_id })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, user_id: Option<Uuid>) -> Self {
        if let Some(path) = db_path {
            self.db_path = path;
        }
        if let Some(user) = user_id {
            self.user_id = user;
        }
        self
    }
}

/// `wordladder.db` in the platform data directory.
pub fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "wordladder")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("wordladder.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_path_and_user_from_environment() {
        let user = Uuid::new_v4();
        let user_str = user.to_string();
        let config =
            AppConfig::from_lookup(lookup(&[(DB_ENV, "/tmp/w.db"), (USER_ENV, &user_str)])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/w.db"));
        assert_eq!(config.user_id, user);
    }

    #[test]
    fn rejects_malformed_user() {
        let err = AppConfig::from_lookup(lookup(&[(DB_ENV, "/tmp/w.db"), (USER_ENV, "bob")]))
            .unwrap_err();
        assert!(err.to_string().contains(USER_ENV));
    }

    #[test]
    fn empty_user_means_local_learner() {
        let config =
            AppConfig::from_lookup(lookup(&[(DB_ENV, "/tmp/w.db"), (USER_ENV, "  ")])).unwrap();
        assert_eq!(config.user_id, Uuid::nil());
    }

    #[test]
    fn overrides_win() {
        let user = Uuid::new_v4();
        let config = AppConfig::from_lookup(lookup(&[(DB_ENV, "/tmp/w.db")]))
            .unwrap()
            .with_overrides(Some(PathBuf::from("/tmp/other.db")), Some(user));
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.user_id, user);
    }
}
