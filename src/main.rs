use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use practice_scoreboard::improvement::{self, SIGNIFICANT_IMPROVEMENT_PERCENT};
use practice_scoreboard::leaderboard::{self, ScoreSelector};
use practice_scoreboard::models::{ActivityInput, Submission};
use practice_scoreboard::report::{self, ReportOptions};
use practice_scoreboard::{db, intake, score};

#[derive(Parser)]
#[command(name = "practice-scoreboard")]
#[command(about = "Daily practice scores, leaderboards and improvement alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Delete one submission by id
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Score a single day of activity
    Score {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        early: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        before: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        mid_morning: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        late_morning: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        reading: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        listening: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        service: i32,
    },
    /// Rank members for a window
    Leaderboard {
        /// Read submissions from a CSV snapshot instead of Postgres
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ScoreSelector::Weekly)]
        window: ScoreSelector,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// List new personal bests, all-time records and significant improvements
    Improvements {
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Show the full comparison for one member instead
        #[arg(long)]
        member: Option<Uuid>,
        #[arg(long, default_value_t = SIGNIFICANT_IMPROVEMENT_PERCENT)]
        threshold: f64,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = SIGNIFICANT_IMPROVEMENT_PERCENT)]
        threshold: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_submissions(csv: Option<PathBuf>) -> anyhow::Result<Vec<Submission>> {
    match csv {
        Some(path) => Ok(intake::load_csv(&path)?.submissions),
        None => {
            let pool = connect().await?;
            db::fetch_submissions(&pool).await
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let summary = db::import_csv(&connect().await?, &csv).await?;
            println!(
                "Inserted {} submissions from {} ({} duplicates, {} rejected).",
                summary.inserted,
                csv.display(),
                summary.duplicates,
                summary.rejected
            );
        }
        Commands::Delete { id } => {
            if db::delete_submission(&connect().await?, id).await? {
                println!("Deleted submission {id}.");
            } else {
                println!("No submission with id {id}.");
            }
        }
        Commands::Score {
            early,
            before,
            mid_morning,
            late_morning,
            reading,
            listening,
            service,
        } => {
            let breakdown = score::compute_score(&ActivityInput {
                early_session: early,
                before_cutoff: before,
                mid_morning,
                late_morning,
                reading_minutes: reading,
                listening_minutes: listening,
                service_minutes: service,
            })?;
            println!("Rounds:    {} ({} points)", breakdown.total_rounds, breakdown.score_a);
            println!("Reading:   {} points", breakdown.score_b);
            println!("Listening: {} points", breakdown.score_c);
            println!("Service:   {} points", breakdown.score_d);
            println!("Total:     {} points", breakdown.total_score);
        }
        Commands::Leaderboard {
            csv,
            window,
            limit,
            as_of,
            json,
        } => {
            let submissions = load_submissions(csv).await?;
            let entries = leaderboard::build_leaderboard(&submissions, as_of.unwrap_or_else(today));
            let ranked = leaderboard::rank(entries, window);
            let top = leaderboard::top_n(&ranked, limit);

            if json {
                println!("{}", serde_json::to_string_pretty(top)?);
                return Ok(());
            }
            if top.is_empty() {
                println!("No submissions found.");
                return Ok(());
            }

            println!("{} leaderboard:", window.label());
            for (position, entry) in top.iter().enumerate() {
                println!(
                    "{}. {} ({} points; week {}, month {}, all time {})",
                    position + 1,
                    entry.entity_name,
                    window.score(entry),
                    entry.weekly_score,
                    entry.monthly_score,
                    entry.all_time_score
                );
            }
        }
        Commands::Improvements {
            csv,
            member,
            threshold,
            json,
        } => {
            // The record check needs every member's scores, not only this one's.
            let submissions = load_submissions(csv).await?;

            if let Some(member) = member {
                let Some((latest, report)) =
                    improvement::detect_for_entity(&submissions, member, threshold)
                else {
                    println!("No dated submissions for member {member}.");
                    return Ok(());
                };
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("Member:          {}", latest.entity_name);
                    println!("Latest:          {}", report.latest);
                    println!(
                        "Personal best:   {} ({:+}, {:.1}%)",
                        report.previous_best, report.improvement, report.percentage_increase
                    );
                    println!(
                        "Prior average:   {:.1} ({:+.1}, {:.1}%)",
                        report.previous_average,
                        report.average_improvement,
                        report.average_percentage_increase
                    );
                    println!("New best:        {}", report.personal_best);
                    println!("All-time record: {}", report.all_time_record);
                    println!("Significant:     {}", report.significant);
                }
                return Ok(());
            }

            let events = improvement::detect_population(&submissions, threshold);

            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
                return Ok(());
            }
            if events.is_empty() {
                println!("No new bests, records or significant improvements.");
                return Ok(());
            }

            for event in events {
                println!(
                    "- {} scored {} on {} ({:+.1}, {:+.1}% against average){}{}{}",
                    event.entity_name,
                    event.latest_score,
                    event.as_of_date,
                    event.absolute_delta,
                    event.percentage_delta,
                    if event.significant { " significant" } else { "" },
                    if event.personal_best { " personal best" } else { "" },
                    if event.all_time_record { " all-time record" } else { "" }
                );
            }
        }
        Commands::Report {
            csv,
            as_of,
            limit,
            threshold,
            out,
        } => {
            let submissions = load_submissions(csv).await?;
            let options = ReportOptions {
                as_of: as_of.unwrap_or_else(today),
                limit,
                threshold_percent: threshold,
            };
            let report = report::build_report(&submissions, &options);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
