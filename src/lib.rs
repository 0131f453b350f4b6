//! Scoring and aggregation for daily practice submissions.
//!
//! Raw activity is scored once by [`score::compute_score`]; the resulting
//! submissions are then grouped by [`aggregate`], ranked by [`leaderboard`] and
//! compared against their own history by [`improvement`]. Every function is a
//! pure computation over a snapshot of submissions.

pub mod aggregate;
pub mod db;
pub mod errors;
pub mod improvement;
pub mod intake;
pub mod leaderboard;
pub mod models;
pub mod report;
pub mod score;
pub mod week;

pub use errors::{IntakeError, ScoringError};
pub use models::*;
