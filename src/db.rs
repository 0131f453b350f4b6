use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::intake;
use crate::models::{ActivityInput, ScoreBreakdown, Submission};
use crate::score;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_member(pool: &PgPool, id: Uuid, full_name: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO practice_scoreboard.members (id, full_name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name
        "#,
    )
    .bind(id)
    .bind(full_name)
    .execute(pool)
    .await?;
    Ok(())
}

/// One submission per member per day; undated rows get a unique key.
fn source_key(submission: &Submission) -> String {
    match submission.date {
        Some(date) => format!("{}:{date}", submission.entity_id),
        None => format!("import-{}", submission.id),
    }
}

/// Stores a scored submission. Returns false when that member already has a
/// submission for the day.
pub async fn insert_submission(pool: &PgPool, submission: &Submission) -> anyhow::Result<bool> {
    let activity = &submission.activity;
    let score = &submission.score;
    let result = sqlx::query(
        r#"
        INSERT INTO practice_scoreboard.submissions
        (id, member_id, submitted_on, early_session, before_cutoff, mid_morning, late_morning,
         reading_minutes, reading_subject, listening_minutes, speaker, service_minutes, service_name,
         total_rounds, score_a, score_b, score_c, score_d, total_score, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(submission.id)
    .bind(submission.entity_id)
    .bind(submission.date)
    .bind(activity.early_session)
    .bind(activity.before_cutoff)
    .bind(activity.mid_morning)
    .bind(activity.late_morning)
    .bind(activity.reading_minutes)
    .bind(&submission.reading_subject)
    .bind(activity.listening_minutes)
    .bind(&submission.speaker)
    .bind(activity.service_minutes)
    .bind(&submission.service_name)
    .bind(score.total_rounds)
    .bind(score.score_a)
    .bind(score.score_b)
    .bind(score.score_c)
    .bind(score.score_d)
    .bind(score.total_score)
    .bind(source_key(submission))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let members = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            [(4, 4, 0, 0), (2, 3, 5, 6), (6, 4, 0, 0)],
            [(20, 10, 0), (20, 50, 10), (60, 30, 30)],
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            [(0, 2, 4, 4), (0, 0, 8, 8), (0, 4, 4, 0)],
            [(0, 15, 20), (10, 0, 45), (30, 15, 15)],
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            [(8, 2, 0, 0), (8, 0, 0, 0), (10, 0, 0, 0)],
            [(45, 30, 0), (50, 50, 5), (90, 60, 60)],
        ),
    ];
    let first_day = NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?;

    for (member_id, name, rounds, minutes) in members {
        upsert_member(pool, member_id, name).await?;

        for (offset, ((early, before, mid, late), (reading, listening, service))) in
            rounds.into_iter().zip(minutes).enumerate()
        {
            let activity = ActivityInput {
                early_session: early,
                before_cutoff: before,
                mid_morning: mid,
                late_morning: late,
                reading_minutes: reading,
                listening_minutes: listening,
                service_minutes: service,
            };
            let label = |minutes: i32, text: &str| (minutes > 0).then(|| text.to_string());
            let submission = Submission {
                id: Uuid::new_v4(),
                date: Some(first_day + chrono::Duration::days(offset as i64)),
                entity_id: member_id,
                entity_name: name.to_string(),
                activity,
                reading_subject: label(reading, "Daily reading"),
                speaker: label(listening, "Morning class"),
                service_name: label(service, "Temple kitchen"),
                score: score::compute_score(&activity)?,
            };
            insert_submission(pool, &submission).await?;
        }
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<ImportSummary> {
    let outcome = intake::load_csv(csv_path)?;
    let mut summary = ImportSummary {
        rejected: outcome.rejected,
        ..ImportSummary::default()
    };

    for submission in &outcome.submissions {
        upsert_member(pool, submission.entity_id, &submission.entity_name).await?;
        if insert_submission(pool, submission).await? {
            summary.inserted += 1;
        } else {
            debug!(member = %submission.entity_id, date = ?submission.date, "duplicate submission");
            summary.duplicates += 1;
        }
    }

    info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        rejected = summary.rejected,
        "imported submissions"
    );
    Ok(summary)
}

pub async fn fetch_submissions(pool: &PgPool) -> anyhow::Result<Vec<Submission>> {
    let query = "SELECT s.id, s.member_id, m.full_name, s.submitted_on, \
         s.early_session, s.before_cutoff, s.mid_morning, s.late_morning, \
         s.reading_minutes, s.reading_subject, s.listening_minutes, s.speaker, \
         s.service_minutes, s.service_name, \
         s.total_rounds, s.score_a, s.score_b, s.score_c, s.score_d, s.total_score \
         FROM practice_scoreboard.submissions s \
         JOIN practice_scoreboard.members m ON m.id = s.member_id \
         ORDER BY s.submitted_on DESC NULLS LAST, s.id";

    let records = sqlx::query(query).fetch_all(pool).await?;
    let mut submissions = Vec::with_capacity(records.len());

    for row in records {
        submissions.push(Submission {
            id: row.get("id"),
            date: row.get("submitted_on"),
            entity_id: row.get("member_id"),
            entity_name: row.get("full_name"),
            activity: ActivityInput {
                early_session: row.get("early_session"),
                before_cutoff: row.get("before_cutoff"),
                mid_morning: row.get("mid_morning"),
                late_morning: row.get("late_morning"),
                reading_minutes: row.get("reading_minutes"),
                listening_minutes: row.get("listening_minutes"),
                service_minutes: row.get("service_minutes"),
            },
            reading_subject: row.get("reading_subject"),
            speaker: row.get("speaker"),
            service_name: row.get("service_name"),
            score: ScoreBreakdown {
                total_rounds: row.get("total_rounds"),
                score_a: row.get("score_a"),
                score_b: row.get("score_b"),
                score_c: row.get("score_c"),
                score_d: row.get("score_d"),
                total_score: row.get("total_score"),
            },
        });
    }

    Ok(submissions)
}

/// Removes a whole submission. Submissions are never edited in place.
pub async fn delete_submission(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM practice_scoreboard.submissions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
