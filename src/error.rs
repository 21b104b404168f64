//! Error taxonomy for study operations.
//!
//! Every operation exposed by [`crate::study::StudyService`] returns a
//! [`StudyResult`]. Validation messages are safe to show to the caller as-is;
//! `NotFound` only ever names the kind of entity, so a lookup for another
//! user's round looks exactly like a lookup for a round that never existed.

use thiserror::Error;

use crate::models::SessionType;

#[derive(Error, Debug)]
pub enum StudyError {
    /// Malformed or oversized input.
    #[error("{0}")]
    Validation(String),

    /// Missing or not owned by the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request disagrees with state already held by the store.
    #[error("{0}")]
    Conflict(String),

    /// Nothing qualifies for a session of this type right now. For a normal
    /// session the caller should offer extra practice instead.
    #[error("{}", empty_pool_message(.0))]
    EmptyPool(SessionType),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl StudyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether the message can be shown to an end user verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_) | Self::EmptyPool(_)
        )
    }
}

fn empty_pool_message(session_type: &SessionType) -> &'static str {
    match session_type {
        SessionType::Normal => "no words left to encounter",
        SessionType::Extra => "no words need extra practice",
    }
}

pub type StudyResult<T> = Result<T, StudyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_only_names_the_entity() {
        let err = StudyError::NotFound("Round");
        assert_eq!(err.to_string(), "Round not found");
        assert!(err.is_user_facing());
    }

    #[test]
    fn empty_pools_explain_themselves() {
        assert_eq!(
            StudyError::EmptyPool(SessionType::Normal).to_string(),
            "no words left to encounter"
        );
        assert!(StudyError::EmptyPool(SessionType::Extra).is_user_facing());
    }

    #[test]
    fn database_errors_are_internal() {
        let err = StudyError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_user_facing());
    }
}
