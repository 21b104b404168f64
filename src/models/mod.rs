//! Domain models for wordladder.
//!
//! # Core Concepts
//!
//! ## Learner data
//!
//! - [`Word`]: A vocabulary entry owned by exactly one user.
//! - [`ReviewState`]: Per-word memory counters, created lazily on first review.
//! - [`ReviewLog`]: Append-only record of every graded encounter. Analytics are
//!   computed from these rows, never from the counters.
//! - [`StudySettings`]: Per-user knobs, created with defaults on first read.
//!
//! ## Study structure
//!
//! - [`StudyRound`]: A closed working set of words studied to completion.
//!   Mastery is only re-evaluated when a round completes.
//! - [`StudySession`]: One bounded batch drawn from a round. Its word order is
//!   fixed at creation and it becomes immutable once completed.

mod review;
mod round;
mod session;
mod settings;
mod word;

pub use review::*;
pub use round::*;
pub use session::*;
pub use settings::*;
pub use word::*;
