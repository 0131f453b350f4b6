use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw daily activity as reported by a member, before scoring.
///
/// Values are signed so that intake can hand over exactly what was entered;
/// the score calculator rejects anything negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInput {
    pub early_session: i32,
    pub before_cutoff: i32,
    pub mid_morning: i32,
    pub late_morning: i32,
    pub reading_minutes: i32,
    pub listening_minutes: i32,
    pub service_minutes: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_rounds: i32,
    /// Rounds, weighted by time of day.
    pub score_a: i32,
    /// Reading.
    pub score_b: i32,
    /// Listening.
    pub score_c: i32,
    /// Service.
    pub score_d: i32,
    pub total_score: i32,
}

/// One daily report for one member. Scores are frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    /// `None` when the stored date could not be normalized to a calendar day.
    pub date: Option<NaiveDate>,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub activity: ActivityInput,
    pub reading_subject: Option<String>,
    pub speaker: Option<String>,
    pub service_name: Option<String>,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Day,
    Week,
    Month,
    AllTime,
}

/// Identifies one period within a [`WindowKind`].
///
/// Ordering is chronological within a kind, which keeps aggregation output stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowKey {
    Day { date: NaiveDate },
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    AllTime,
}

impl WindowKey {
    pub fn kind(&self) -> WindowKind {
        match self {
            WindowKey::Day { .. } => WindowKind::Day,
            WindowKey::Week { .. } => WindowKind::Week,
            WindowKey::Month { .. } => WindowKind::Month,
            WindowKey::AllTime => WindowKind::AllTime,
        }
    }
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowKey::Day { date } => write!(f, "{date}"),
            WindowKey::Week { year, week } => write!(f, "{year}-W{week:02}"),
            WindowKey::Month { year, month } => write!(f, "{year}-{month:02}"),
            WindowKey::AllTime => write!(f, "all-time"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateWindow {
    pub entity_id: Uuid,
    pub entity_name: String,
    pub key: WindowKey,
    pub total_score: i64,
    pub submission_count: usize,
}

impl AggregateWindow {
    pub fn kind(&self) -> WindowKind {
        self.key.kind()
    }
}

/// Highest entity total inside one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMaximum {
    pub key: WindowKey,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub total_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub entity_id: Uuid,
    pub entity_name: String,
    pub weekly_score: i64,
    pub monthly_score: i64,
    pub all_time_score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementEvent {
    pub entity_id: Uuid,
    pub entity_name: String,
    pub latest_score: i64,
    pub prior_best_or_average: f64,
    pub absolute_delta: f64,
    pub percentage_delta: f64,
    pub as_of_date: NaiveDate,
    pub personal_best: bool,
    pub all_time_record: bool,
    pub significant: bool,
}
