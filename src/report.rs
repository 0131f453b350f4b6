use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate::{aggregate, window_key, window_maxima, SubmissionFilter};
use crate::improvement;
use crate::leaderboard::{self, ScoreSelector};
use crate::models::{Submission, WindowKind};
use crate::week;

#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub as_of: NaiveDate,
    pub limit: usize,
    pub threshold_percent: f64,
}

pub fn build_report(submissions: &[Submission], options: &ReportOptions) -> String {
    let entries = leaderboard::build_leaderboard(submissions, options.as_of);
    let week_key = window_key(options.as_of, WindowKind::Week);
    let daily = aggregate(submissions, WindowKind::Day, &SubmissionFilter::within(week_key));
    let events = improvement::detect_population(submissions, options.threshold_percent);

    let mut output = String::new();
    let _ = writeln!(output, "# Practice Scoreboard");
    let (start, end) = week::week_date_range(week::week_number(options.as_of), week::iso_year(options.as_of))
        .unwrap_or((options.as_of, options.as_of));
    let _ = writeln!(
        output,
        "Generated as of {} (week {}, {} to {})",
        options.as_of,
        week::week_number(options.as_of),
        start,
        end
    );

    for selector in [ScoreSelector::Weekly, ScoreSelector::Monthly, ScoreSelector::AllTime] {
        let ranked = leaderboard::rank(entries.clone(), selector);
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", selector.label());

        let scored: Vec<_> = leaderboard::top_n(&ranked, options.limit)
            .iter()
            .filter(|entry| selector.score(entry) > 0)
            .collect();
        if scored.is_empty() {
            let _ = writeln!(output, "No scores recorded for this window.");
            continue;
        }
        for (position, entry) in scored.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} with {} points",
                position + 1,
                entry.entity_name,
                selector.score(entry)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Score Each Day");
    let maxima = window_maxima(&daily.windows);
    if maxima.is_empty() {
        let _ = writeln!(output, "No submissions this week.");
    } else {
        for maximum in maxima {
            let _ = writeln!(
                output,
                "- {}: {} ({} points)",
                maximum.key, maximum.entity_name, maximum.total_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Improvement Alerts");
    if events.is_empty() {
        let _ = writeln!(output, "No new bests, records or significant improvements.");
    } else {
        for event in &events {
            let mut badges = Vec::new();
            if event.significant {
                badges.push("significant improvement");
            }
            if event.personal_best {
                badges.push("personal best");
            }
            if event.all_time_record {
                badges.push("all-time record");
            }
            let suffix = if badges.is_empty() {
                String::new()
            } else {
                format!(" [{}]", badges.join(", "))
            };
            let _ = writeln!(
                output,
                "- {} scored {} on {}, {:+.1}% against their average of {:.1}{}",
                event.entity_name,
                event.latest_score,
                event.as_of_date,
                event.percentage_delta,
                event.prior_best_or_average,
                suffix
            );
        }
    }

    let excluded = aggregate(submissions, WindowKind::AllTime, &SubmissionFilter::all()).excluded;
    if excluded > 0 {
        let _ = writeln!(output);
        let _ = writeln!(output, "_{excluded} submission(s) without a usable date were left out._");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::submission;
    use uuid::Uuid;

    fn options() -> ReportOptions {
        ReportOptions {
            as_of: NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
            limit: 10,
            threshold_percent: improvement::SIGNIFICANT_IMPROVEMENT_PERCENT,
        }
    }

    #[test]
    fn empty_report_has_placeholders() {
        let report = build_report(&[], &options());
        assert!(report.contains("# Practice Scoreboard"));
        assert!(report.contains("No scores recorded for this window."));
        assert!(report.contains("No submissions this week."));
        assert!(report.contains("No new bests, records or significant improvements."));
    }

    #[test]
    fn report_lists_rankings_alerts_and_exclusions() {
        let avery = Uuid::new_v4();
        let jules = Uuid::new_v4();
        let day = |d| NaiveDate::from_ymd_opt(2026, 2, d);
        let submissions = vec![
            submission(avery, "Avery", day(4), 90),
            submission(avery, "Avery", day(3), 60),
            submission(avery, "Avery", day(2), 50),
            submission(jules, "Jules", day(3), 70),
            submission(jules, "Jules", None, 10),
        ];

        let report = build_report(&submissions, &options());
        assert!(report.contains("## This week\n1. Avery with 200 points\n2. Jules with 70 points"));
        assert!(report.contains("- 2026-02-03: Jules (70 points)"));
        assert!(report.contains("Avery scored 90 on 2026-02-04"));
        assert!(report.contains("[significant improvement, personal best, all-time record]"));
        assert!(report.contains("1 submission(s) without a usable date"));
    }
}
