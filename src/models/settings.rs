use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SESSION_SIZE: u32 = 20;
pub const DEFAULT_FREEZE_ROUNDS: u32 = 3;
pub const MAX_SESSION_SIZE: u32 = 100;
pub const MAX_FREEZE_ROUNDS: u32 = 50;

/// Per-user study preferences.
///
/// A missing record is never an error: reading settings for a user without
/// one creates the default record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudySettings {
    pub user_id: Uuid,
    /// Upper bound on words per session.
    pub session_size: u32,
    /// Cooldown length, in completed rounds, after the first promotion.
    pub freeze_rounds: u32,
    pub auto_play_audio: bool,
    /// Require two consecutive first-try-known rounds before the first freeze.
    pub require_consecutive_known: bool,
    pub updated_at: DateTime<Utc>,
}

impl StudySettings {
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            session_size: DEFAULT_SESSION_SIZE,
            freeze_rounds: DEFAULT_FREEZE_ROUNDS,
            auto_play_audio: true,
            require_consecutive_known: false,
            updated_at: Utc::now(),
        }
    }
}

/// Input for updating settings. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub session_size: Option<u32>,
    pub freeze_rounds: Option<u32>,
    pub auto_play_audio: Option<bool>,
    pub require_consecutive_known: Option<bool>,
}
