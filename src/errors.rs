use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("invalid input for {field}: {value}")]
    InvalidInput { field: &'static str, value: i64 },

    #[error("ambiguous date: {0:?}")]
    AmbiguousDate(String),
}

/// Reasons a submission is refused at intake.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("{field} is required when {minutes_field} is above zero")]
    MissingLabel {
        field: &'static str,
        minutes_field: &'static str,
    },

    #[error("malformed row: {0}")]
    Malformed(#[from] csv::Error),
}
