use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{IntakeError, ScoringError};
use crate::models::{ActivityInput, Submission};
use crate::score;

/// One line of a submissions CSV, as typed by the member.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvRow {
    pub date: String,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub early_session: i32,
    pub before_cutoff: i32,
    pub mid_morning: i32,
    pub late_morning: i32,
    pub reading_minutes: i32,
    pub reading_subject: Option<String>,
    pub listening_minutes: i32,
    pub speaker: Option<String>,
    pub service_minutes: i32,
    pub service_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct IntakeOutcome {
    pub submissions: Vec<Submission>,
    pub rejected: usize,
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, which is reduced to its
/// UTC calendar day.
pub fn parse_submission_date(raw: &str) -> Result<NaiveDate, ScoringError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| ScoringError::AmbiguousDate(raw.to_string()))
}

fn label(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_label(
    minutes: i32,
    value: &Option<String>,
    field: &'static str,
    minutes_field: &'static str,
) -> Result<(), IntakeError> {
    if minutes > 0 && value.is_none() {
        return Err(IntakeError::MissingLabel {
            field,
            minutes_field,
        });
    }
    Ok(())
}

/// Validates a row and freezes its score. An unparseable date does not reject
/// the row; the submission is kept undated and aggregation will skip it.
pub fn build_submission(row: CsvRow) -> Result<Submission, IntakeError> {
    let activity = ActivityInput {
        early_session: row.early_session,
        before_cutoff: row.before_cutoff,
        mid_morning: row.mid_morning,
        late_morning: row.late_morning,
        reading_minutes: row.reading_minutes,
        listening_minutes: row.listening_minutes,
        service_minutes: row.service_minutes,
    };
    let score = score::compute_score(&activity)?;

    let reading_subject = label(row.reading_subject);
    let speaker = label(row.speaker);
    let service_name = label(row.service_name);
    require_label(row.reading_minutes, &reading_subject, "reading_subject", "reading_minutes")?;
    require_label(row.listening_minutes, &speaker, "speaker", "listening_minutes")?;
    require_label(row.service_minutes, &service_name, "service_name", "service_minutes")?;

    let date = match parse_submission_date(&row.date) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(entity = %row.entity_name, error = %err, "keeping submission without a date");
            None
        }
    };

    Ok(Submission {
        id: Uuid::new_v4(),
        date,
        entity_id: row.entity_id,
        entity_name: row.entity_name.trim().to_string(),
        activity,
        reading_subject,
        speaker,
        service_name,
        score,
    })
}

pub fn read_csv<R: Read>(reader: R) -> anyhow::Result<IntakeOutcome> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut outcome = IntakeOutcome::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let built = result
            .map_err(IntakeError::from)
            .and_then(build_submission);
        match built {
            Ok(submission) => outcome.submissions.push(submission),
            Err(err) => {
                // Header is line 1.
                warn!(line = index + 2, error = %err, "rejected submission row");
                outcome.rejected += 1;
            }
        }
    }

    info!(
        accepted = outcome.submissions.len(),
        rejected = outcome.rejected,
        "read submissions"
    );
    Ok(outcome)
}

pub fn load_csv(path: &Path) -> anyhow::Result<IntakeOutcome> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_csv(file)
}
