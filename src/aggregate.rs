use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AggregateWindow, Submission, WindowKey, WindowKind, WindowMaximum};
use crate::week;

pub fn window_key(date: NaiveDate, kind: WindowKind) -> WindowKey {
    match kind {
        WindowKind::Day => WindowKey::Day { date },
        WindowKind::Week => WindowKey::Week {
            year: week::iso_year(date),
            week: week::week_number(date),
        },
        WindowKind::Month => WindowKey::Month {
            year: date.year(),
            month: date.month(),
        },
        WindowKind::AllTime => WindowKey::AllTime,
    }
}

/// Day a window is filed under when it is tested against a window of another
/// kind: the day itself, the Thursday of a week (as ISO numbering does), the
/// first of a month. The all-time bucket has none.
pub fn anchor_day(key: WindowKey) -> Option<NaiveDate> {
    match key {
        WindowKey::Day { date } => Some(date),
        WindowKey::Week { year, week } => NaiveDate::from_isoywd_opt(year, week, Weekday::Thu),
        WindowKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
        WindowKey::AllTime => None,
    }
}

/// Display-name order: case-folded first, then exact, so "avery" sits
/// before "Zed".
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Restricts which submissions take part in an aggregation. Every field is
/// optional; an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub entity_id: Option<Uuid>,
    /// Keep only groups whose window falls inside this one (see [`anchor_day`]).
    /// The window may be of a different kind than the one being aggregated;
    /// it is tested against the group's key, never the raw date, so a week
    /// straddling two months is kept or dropped whole.
    pub window: Option<WindowKey>,
    /// Case-insensitive substring of the entity name.
    pub name_contains: Option<String>,
}

impl SubmissionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn entity(entity_id: Uuid) -> Self {
        Self {
            entity_id: Some(entity_id),
            ..Self::default()
        }
    }

    pub fn within(window: WindowKey) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    fn matches_identity(&self, submission: &Submission) -> bool {
        if let Some(id) = self.entity_id {
            if submission.entity_id != id {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !submission
                .entity_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }

    fn matches_key(&self, key: WindowKey) -> bool {
        match self.window {
            Some(window) => match anchor_day(key) {
                Some(day) => window_key(day, window.kind()) == window,
                None => window == WindowKey::AllTime,
            },
            None => true,
        }
    }

    /// The same predicate applied to an already aggregated group.
    pub fn matches_window(&self, window: &AggregateWindow) -> bool {
        self.entity_id.map_or(true, |id| id == window.entity_id)
            && self.name_contains.as_ref().map_or(true, |needle| {
                window
                    .entity_name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
            && self.matches_key(window.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationOutcome {
    /// Sorted by window key, then entity id.
    pub windows: Vec<AggregateWindow>,
    /// Submissions that passed the identity filters but carried no usable date.
    pub excluded: usize,
}

impl AggregationOutcome {
    /// Combines outcomes computed over disjoint sets of submissions.
    pub fn merge(self, other: AggregationOutcome) -> AggregationOutcome {
        let mut groups: BTreeMap<(WindowKey, Uuid), AggregateWindow> = BTreeMap::new();
        for window in self.windows.into_iter().chain(other.windows) {
            groups
                .entry((window.key, window.entity_id))
                .and_modify(|existing| {
                    existing.total_score += window.total_score;
                    existing.submission_count += window.submission_count;
                })
                .or_insert(window);
        }

        AggregationOutcome {
            windows: groups.into_values().collect(),
            excluded: self.excluded + other.excluded,
        }
    }

    pub fn for_entity(&self, entity_id: Uuid) -> impl Iterator<Item = &AggregateWindow> {
        self.windows
            .iter()
            .filter(move |window| window.entity_id == entity_id)
    }
}

struct Group {
    entity_name: String,
    name_date: NaiveDate,
    total_score: i64,
    submission_count: usize,
}

/// Sums `total_score` per entity per window of `kind`.
pub fn aggregate(
    submissions: &[Submission],
    kind: WindowKind,
    filter: &SubmissionFilter,
) -> AggregationOutcome {
    let mut groups: BTreeMap<(WindowKey, Uuid), Group> = BTreeMap::new();
    let mut excluded = 0usize;

    for submission in submissions {
        if !filter.matches_identity(submission) {
            continue;
        }
        let Some(date) = submission.date else {
            excluded += 1;
            continue;
        };
        let key = window_key(date, kind);
        if !filter.matches_key(key) {
            continue;
        }
        let group = groups
            .entry((key, submission.entity_id))
            .or_insert_with(|| Group {
                entity_name: submission.entity_name.clone(),
                name_date: date,
                total_score: 0,
                submission_count: 0,
            });
        // Display name follows the most recent submission.
        if date > group.name_date {
            group.entity_name = submission.entity_name.clone();
            group.name_date = date;
        }
        group.total_score += i64::from(submission.score.total_score);
        group.submission_count += 1;
    }

    if excluded > 0 {
        warn!(excluded, ?kind, "skipped submissions without a usable date");
    }
    debug!(groups = groups.len(), ?kind, "aggregated submissions");

    let windows = groups
        .into_iter()
        .map(|((key, entity_id), group)| AggregateWindow {
            entity_id,
            entity_name: group.entity_name,
            key,
            total_score: group.total_score,
            submission_count: group.submission_count,
        })
        .collect();

    AggregationOutcome { windows, excluded }
}

/// Best entity per window; ties go to the smaller name, then the smaller id.
pub fn window_maxima(windows: &[AggregateWindow]) -> Vec<WindowMaximum> {
    let mut best: BTreeMap<WindowKey, &AggregateWindow> = BTreeMap::new();
    for window in windows {
        best.entry(window.key)
            .and_modify(|current| {
                let better = window.total_score > current.total_score
                    || (window.total_score == current.total_score
                        && compare_names(&window.entity_name, &current.entity_name)
                            .then_with(|| window.entity_id.cmp(&current.entity_id))
                            == Ordering::Less);
                if better {
                    *current = window;
                }
            })
            .or_insert(window);
    }

    best.into_iter()
        .map(|(key, window)| WindowMaximum {
            key,
            entity_id: window.entity_id,
            entity_name: window.entity_name.clone(),
            total_score: window.total_score,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ActivityInput, ScoreBreakdown};

    pub(crate) fn submission(entity_id: Uuid, name: &str, date: Option<NaiveDate>, score: i32) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            date,
            entity_id,
            entity_name: name.to_string(),
            activity: ActivityInput::default(),
            reading_subject: None,
            speaker: None,
            service_name: None,
            score: ScoreBreakdown {
                total_score: score,
                ..ScoreBreakdown::default()
            },
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn sample() -> (Uuid, Uuid, Vec<Submission>) {
        let avery = Uuid::new_v4();
        let jules = Uuid::new_v4();
        let submissions = vec![
            submission(avery, "Avery", ymd(2026, 1, 5), 40),
            submission(avery, "Avery", ymd(2026, 1, 6), 35),
            submission(avery, "Avery", ymd(2026, 2, 2), 50),
            submission(jules, "Jules", ymd(2026, 1, 6), 60),
            submission(jules, "Jules", None, 99),
        ];
        (avery, jules, submissions)
    }

    #[test]
    fn weekly_totals_group_by_entity_and_iso_week() {
        let (avery, jules, submissions) = sample();
        let outcome = aggregate(&submissions, WindowKind::Week, &SubmissionFilter::all());

        assert_eq!(outcome.excluded, 1);
        let week2 = WindowKey::Week { year: 2026, week: 2 };
        let avery_week: Vec<_> = outcome.for_entity(avery).filter(|w| w.key == week2).collect();
        assert_eq!(avery_week.len(), 1);
        assert_eq!(avery_week[0].total_score, 75);
        assert_eq!(avery_week[0].submission_count, 2);

        let jules_total: i64 = outcome.for_entity(jules).map(|w| w.total_score).sum();
        assert_eq!(jules_total, 60);
    }

    #[test]
    fn all_time_uses_single_bucket() {
        let (avery, _, submissions) = sample();
        let outcome = aggregate(&submissions, WindowKind::AllTime, &SubmissionFilter::all());
        assert!(outcome.windows.iter().all(|w| w.key == WindowKey::AllTime));
        let avery_total = outcome.for_entity(avery).next().unwrap();
        assert_eq!(avery_total.total_score, 125);
        assert_eq!(avery_total.submission_count, 3);
    }

    #[test]
    fn filtering_before_matches_discarding_after() {
        let (avery, jules, mut submissions) = sample();
        // Week 5 of 2026 runs Jan 26 to Feb 1; its Thursday is in January.
        submissions.push(submission(avery, "Avery", ymd(2026, 1, 30), 20));
        submissions.push(submission(avery, "Avery", ymd(2026, 2, 1), 15));
        submissions.push(submission(jules, "Jules", ymd(2025, 12, 30), 25));
        submissions.push(submission(avery, "Avery", None, 5));

        let january = WindowKey::Month { year: 2026, month: 1 };
        let filters = [
            SubmissionFilter::entity(avery),
            SubmissionFilter {
                name_contains: Some("jul".to_string()),
                ..SubmissionFilter::default()
            },
            SubmissionFilter::within(january),
            SubmissionFilter::within(WindowKey::Week { year: 2026, week: 5 }),
            SubmissionFilter::within(WindowKey::AllTime),
            SubmissionFilter {
                entity_id: Some(avery),
                window: Some(january),
                name_contains: Some("AVE".to_string()),
            },
        ];
        let kinds = [WindowKind::Day, WindowKind::Week, WindowKind::Month, WindowKind::AllTime];

        for filter in &filters {
            let undated = submissions
                .iter()
                .filter(|s| s.date.is_none() && filter.matches_identity(s))
                .count();
            for kind in kinds {
                let filtered = aggregate(&submissions, kind, filter);
                let full = aggregate(&submissions, kind, &SubmissionFilter::all());
                let kept: Vec<_> = full
                    .windows
                    .iter()
                    .filter(|w| filter.matches_window(w))
                    .cloned()
                    .collect();
                assert_eq!(filtered.windows, kept, "{filter:?} over {kind:?}");
                assert_eq!(filtered.excluded, undated, "{filter:?} over {kind:?}");
            }
        }
    }

    #[test]
    fn straddling_week_is_kept_whole_by_month_filter() {
        let id = Uuid::new_v4();
        let submissions = vec![
            submission(id, "Avery", ymd(2026, 1, 30), 20),
            submission(id, "Avery", ymd(2026, 2, 1), 15),
        ];
        let january = aggregate(
            &submissions,
            WindowKind::Week,
            &SubmissionFilter::within(WindowKey::Month { year: 2026, month: 1 }),
        );
        assert_eq!(january.windows.len(), 1);
        assert_eq!(january.windows[0].total_score, 35);

        let february = aggregate(
            &submissions,
            WindowKind::Week,
            &SubmissionFilter::within(WindowKey::Month { year: 2026, month: 2 }),
        );
        assert!(february.windows.is_empty());
    }

    #[test]
    fn window_filter_accepts_other_kinds() {
        let (_, _, submissions) = sample();
        let january = WindowKey::Month { year: 2026, month: 1 };
        let outcome = aggregate(&submissions, WindowKind::Day, &SubmissionFilter::within(january));
        assert_eq!(outcome.windows.len(), 3);
        assert!(outcome
            .windows
            .iter()
            .all(|w| matches!(w.key, WindowKey::Day { date } if date.month() == 1)));
    }

    #[test]
    fn name_filter_is_case_insensitive() {
        let (_, jules, submissions) = sample();
        let filter = SubmissionFilter {
            name_contains: Some("JUL".to_string()),
            ..SubmissionFilter::default()
        };
        let outcome = aggregate(&submissions, WindowKind::AllTime, &filter);
        assert_eq!(outcome.windows.len(), 1);
        assert_eq!(outcome.windows[0].entity_id, jules);
        assert_eq!(outcome.excluded, 1);
    }

    #[test]
    fn merging_partitions_equals_full_aggregation() {
        let (_, _, submissions) = sample();
        for split in 0..=submissions.len() {
            let (left, right) = submissions.split_at(split);
            let merged = aggregate(left, WindowKind::Week, &SubmissionFilter::all())
                .merge(aggregate(right, WindowKind::Week, &SubmissionFilter::all()));
            let full = aggregate(&submissions, WindowKind::Week, &SubmissionFilter::all());
            assert_eq!(merged.excluded, full.excluded);
            let totals = |o: &AggregationOutcome| -> Vec<_> {
                o.windows
                    .iter()
                    .map(|w| (w.key, w.entity_id, w.total_score, w.submission_count))
                    .collect()
            };
            assert_eq!(totals(&merged), totals(&full));
        }
    }

    #[test]
    fn display_name_follows_latest_submission() {
        let id = Uuid::new_v4();
        let submissions = vec![
            submission(id, "New Name", ymd(2026, 3, 10), 10),
            submission(id, "Old Name", ymd(2026, 3, 1), 10),
        ];
        let outcome = aggregate(&submissions, WindowKind::AllTime, &SubmissionFilter::all());
        assert_eq!(outcome.windows[0].entity_name, "New Name");
    }

    #[test]
    fn maxima_break_ties_by_name() {
        let day = ymd(2026, 1, 6);
        let submissions = vec![
            submission(Uuid::new_v4(), "Zed", day, 60),
            submission(Uuid::new_v4(), "avery", day, 60),
            submission(Uuid::new_v4(), "Avery", day, 60),
            submission(Uuid::new_v4(), "Kiara", day, 20),
        ];
        let outcome = aggregate(&submissions, WindowKind::Day, &SubmissionFilter::all());
        let maxima = window_maxima(&outcome.windows);
        assert_eq!(maxima.len(), 1);
        assert_eq!(maxima[0].entity_name, "Avery");
        assert_eq!(maxima[0].total_score, 60);
    }
}
