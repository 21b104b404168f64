//! wordladder: round-based spaced-repetition scheduling for vocabulary study.
//!
//! Learners group words into rounds and work through them in bounded
//! sessions. A word only climbs the mastery ladder when a whole round is
//! completed, and a fixed-interval review path runs alongside for ad-hoc
//! drilling. Everything is stored in SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod learning;
pub mod models;
pub mod study;

pub use error::{StudyError, StudyResult};
pub use study::StudyService;
