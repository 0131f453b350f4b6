use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::aggregate::{aggregate, compare_names, window_key, SubmissionFilter};
use crate::models::{LeaderboardEntry, Submission, WindowKind};

/// Which window score a leaderboard is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScoreSelector {
    Weekly,
    Monthly,
    AllTime,
}

impl ScoreSelector {
    pub fn score(&self, entry: &LeaderboardEntry) -> i64 {
        match self {
            ScoreSelector::Weekly => entry.weekly_score,
            ScoreSelector::Monthly => entry.monthly_score,
            ScoreSelector::AllTime => entry.all_time_score,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreSelector::Weekly => "This week",
            ScoreSelector::Monthly => "This month",
            ScoreSelector::AllTime => "All time",
        }
    }
}

/// Weekly (ISO week of `as_of`), monthly (calendar month of `as_of`) and
/// all-time totals for every entity with at least one dated submission.
/// Unsorted; pass the result to [`rank`].
pub fn build_leaderboard(submissions: &[Submission], as_of: NaiveDate) -> Vec<LeaderboardEntry> {
    let all_time = aggregate(submissions, WindowKind::AllTime, &SubmissionFilter::all());
    let weekly = aggregate(
        submissions,
        WindowKind::Week,
        &SubmissionFilter::within(window_key(as_of, WindowKind::Week)),
    );
    let monthly = aggregate(
        submissions,
        WindowKind::Month,
        &SubmissionFilter::within(window_key(as_of, WindowKind::Month)),
    );

    let weekly: HashMap<Uuid, i64> = weekly
        .windows
        .iter()
        .map(|w| (w.entity_id, w.total_score))
        .collect();
    let monthly: HashMap<Uuid, i64> = monthly
        .windows
        .iter()
        .map(|w| (w.entity_id, w.total_score))
        .collect();

    all_time
        .windows
        .into_iter()
        .map(|w| LeaderboardEntry {
            weekly_score: weekly.get(&w.entity_id).copied().unwrap_or_default(),
            monthly_score: monthly.get(&w.entity_id).copied().unwrap_or_default(),
            all_time_score: w.total_score,
            entity_id: w.entity_id,
            entity_name: w.entity_name,
        })
        .collect()
}

/// Sorts descending by the selected score. Equal scores order by name with
/// case folded ("avery" before "Zed"), then by exact name, then by id, so the
/// result never depends on input order.
pub fn rank(mut entries: Vec<LeaderboardEntry>, selector: ScoreSelector) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| compare(a, b, selector));
    entries
}

fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry, selector: ScoreSelector) -> Ordering {
    selector
        .score(b)
        .cmp(&selector.score(a))
        .then_with(|| compare_names(&a.entity_name, &b.entity_name))
        .then_with(|| a.entity_id.cmp(&b.entity_id))
}

pub fn top_n(entries: &[LeaderboardEntry], n: usize) -> &[LeaderboardEntry] {
    &entries[..n.min(entries.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::submission;

    fn entry(name: &str, weekly: i64, monthly: i64, all_time: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            entity_id: Uuid::new_v4(),
            entity_name: name.to_string(),
            weekly_score: weekly,
            monthly_score: monthly,
            all_time_score: all_time,
        }
    }

    fn names(entries: &[LeaderboardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.entity_name.as_str()).collect()
    }

    #[test]
    fn ranks_descending_by_selected_window() {
        let entries = vec![
            entry("Avery", 10, 300, 900),
            entry("Jules", 80, 200, 1000),
            entry("Kiara", 50, 400, 100),
        ];
        assert_eq!(names(&rank(entries.clone(), ScoreSelector::Weekly)), ["Jules", "Kiara", "Avery"]);
        assert_eq!(names(&rank(entries.clone(), ScoreSelector::Monthly)), ["Kiara", "Avery", "Jules"]);
        assert_eq!(names(&rank(entries, ScoreSelector::AllTime)), ["Jules", "Avery", "Kiara"]);
    }

    #[test]
    fn ties_break_by_name_regardless_of_input_order() {
        let forward = vec![entry("Zed", 50, 0, 0), entry("Avery", 50, 0, 0), entry("Mina", 70, 0, 0)];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(names(&rank(forward, ScoreSelector::Weekly)), ["Mina", "Avery", "Zed"]);
        assert_eq!(names(&rank(backward, ScoreSelector::Weekly)), ["Mina", "Avery", "Zed"]);
    }

    #[test]
    fn name_ties_ignore_case() {
        let entries = vec![
            entry("Zed", 50, 0, 0),
            entry("avery", 50, 0, 0),
            entry("Avery", 50, 0, 0),
            entry("bea", 50, 0, 0),
        ];
        assert_eq!(
            names(&rank(entries, ScoreSelector::Weekly)),
            ["Avery", "avery", "bea", "Zed"]
        );
    }

    #[test]
    fn top_n_never_exceeds_population() {
        let ranked = rank(vec![entry("A", 1, 1, 1), entry("B", 2, 2, 2)], ScoreSelector::AllTime);
        assert_eq!(top_n(&ranked, 1).len(), 1);
        assert_eq!(top_n(&ranked, 10).len(), 2);
        assert!(top_n(&[], 3).is_empty());
        assert!(top_n(&ranked, 0).is_empty());
    }

    #[test]
    fn entries_split_scores_by_window() {
        let avery = Uuid::new_v4();
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 28).unwrap();
        let submissions = vec![
            submission(avery, "Avery", NaiveDate::from_ymd_opt(2026, 1, 27), 40),
            submission(avery, "Avery", NaiveDate::from_ymd_opt(2026, 1, 12), 30),
            submission(avery, "Avery", NaiveDate::from_ymd_opt(2025, 12, 30), 20),
            submission(avery, "Avery", None, 99),
        ];
        let entries = build_leaderboard(&submissions, as_of);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].weekly_score, 40);
        assert_eq!(entries[0].monthly_score, 70);
        assert_eq!(entries[0].all_time_score, 90);
    }

    #[test]
    fn entity_without_current_activity_scores_zero_this_week() {
        let as_of = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let submissions = vec![submission(
            Uuid::new_v4(),
            "Jules",
            NaiveDate::from_ymd_opt(2026, 1, 6),
            60,
        )];
        let entries = build_leaderboard(&submissions, as_of);
        assert_eq!(entries[0].weekly_score, 0);
        assert_eq!(entries[0].monthly_score, 0);
        assert_eq!(entries[0].all_time_score, 60);
    }
}
