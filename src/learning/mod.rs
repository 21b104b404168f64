//! Pure learning engines.
//!
//! Nothing in here touches the database and nothing in here fails: every
//! function is total over its inputs and returns a sensible default for empty
//! input.

pub mod activity;
pub mod mastery;
pub mod rating;
pub mod scheduler;
pub mod status;

pub use activity::{build_activity_grid, ActivityCell, ActivityGrid};
pub use mastery::{LadderPhase, LadderRules, MasteryColumns, MasteryState};
pub use rating::{rate_memory, MemoryLevel, MemoryRating, RatingInput};
pub use scheduler::{plan_next_review, ReviewPlan};
pub use status::{derive_round_status, derive_status, WordStatus};
