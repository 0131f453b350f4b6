use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{ImprovementEvent, Submission};

/// Percentage over the prior average that counts as a significant improvement.
pub const SIGNIFICANT_IMPROVEMENT_PERCENT: f64 = 20.0;
/// Entries (latest included) needed before significance is considered.
pub const MIN_HISTORY_FOR_SIGNIFICANCE: usize = 3;

/// Comparison of an entity's latest score against its own history.
///
/// Two baselines are kept apart: the personal best (max of the prior entries)
/// and the prior average. Significance is judged against the average only.
/// `all_time_record` needs the whole population and is only filled in by
/// [`detect_for_entity`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImprovementReport {
    pub latest: i64,
    pub previous_best: i64,
    pub improvement: i64,
    pub percentage_increase: f64,
    pub previous_average: f64,
    pub average_improvement: f64,
    pub average_percentage_increase: f64,
    pub personal_best: bool,
    pub all_time_record: bool,
    pub significant: bool,
}

impl ImprovementReport {
    pub fn is_notable(&self) -> bool {
        self.personal_best || self.all_time_record || self.significant
    }
}

pub fn detect(history: &[i64]) -> ImprovementReport {
    detect_with_threshold(history, SIGNIFICANT_IMPROVEMENT_PERCENT)
}

/// `history` is ordered most recent first. An empty history yields the
/// neutral report.
pub fn detect_with_threshold(history: &[i64], threshold_percent: f64) -> ImprovementReport {
    let Some((&latest, prior)) = history.split_first() else {
        return ImprovementReport::default();
    };

    let previous_best = prior.iter().copied().max().unwrap_or(latest);
    let improvement = latest.saturating_sub(previous_best);
    let percentage_increase = percentage(latest as f64 - previous_best as f64, previous_best as f64);

    // Summed as floats so extreme histories cannot overflow.
    let previous_average = if prior.is_empty() {
        latest as f64
    } else {
        prior.iter().map(|&score| score as f64).sum::<f64>() / prior.len() as f64
    };
    let average_improvement = latest as f64 - previous_average;
    let average_percentage_increase = percentage(average_improvement, previous_average);

    ImprovementReport {
        latest,
        previous_best,
        improvement,
        percentage_increase,
        previous_average,
        average_improvement,
        average_percentage_increase,
        personal_best: !prior.is_empty() && latest > previous_best,
        all_time_record: false,
        significant: history.len() >= MIN_HISTORY_FOR_SIGNIFICANCE
            && average_percentage_increase > threshold_percent,
    }
}

fn percentage(delta: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        delta * 100.0 / baseline
    } else {
        0.0
    }
}

/// True when `latest` strictly beats every other score on record.
/// With nothing to compare against there is no record.
pub fn is_all_time_record(latest: i64, others: &[i64]) -> bool {
    others.iter().max().is_some_and(|&best| latest > best)
}

fn newest_first(a: &&Submission, b: &&Submission) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id))
}

/// Report on one entity's most recent dated submission. Its own dated history
/// gives the best and average baselines; every other dated submission in
/// `submissions`, from any entity, decides the all-time record. `None` when
/// the entity has no dated submission.
pub fn detect_for_entity(
    submissions: &[Submission],
    entity_id: Uuid,
    threshold_percent: f64,
) -> Option<(&Submission, ImprovementReport)> {
    let mut history: Vec<&Submission> = submissions
        .iter()
        .filter(|s| s.entity_id == entity_id && s.date.is_some())
        .collect();
    history.sort_by(newest_first);
    let latest = *history.first()?;

    let scores: Vec<i64> = history
        .iter()
        .map(|s| i64::from(s.score.total_score))
        .collect();
    let mut report = detect_with_threshold(&scores, threshold_percent);

    let others: Vec<i64> = submissions
        .iter()
        .filter(|s| s.date.is_some() && s.id != latest.id)
        .map(|s| i64::from(s.score.total_score))
        .collect();
    report.all_time_record = is_all_time_record(report.latest, &others);

    Some((latest, report))
}

/// One event per entity whose latest dated submission is a new personal
/// best, a new all-time record or a significant improvement. Sorted by
/// percentage over the prior average, largest first.
pub fn detect_population(submissions: &[Submission], threshold_percent: f64) -> Vec<ImprovementEvent> {
    let entity_ids: BTreeSet<Uuid> = submissions
        .iter()
        .filter(|s| s.date.is_some())
        .map(|s| s.entity_id)
        .collect();

    let mut events = Vec::new();
    for entity_id in entity_ids {
        let Some((latest, report)) = detect_for_entity(submissions, entity_id, threshold_percent) else {
            continue;
        };
        let Some(as_of_date) = latest.date else {
            continue;
        };
        if !report.is_notable() {
            continue;
        }

        events.push(ImprovementEvent {
            entity_id,
            entity_name: latest.entity_name.clone(),
            latest_score: report.latest,
            prior_best_or_average: report.previous_average,
            absolute_delta: report.average_improvement,
            percentage_delta: report.average_percentage_increase,
            as_of_date,
            personal_best: report.personal_best,
            all_time_record: report.all_time_record,
            significant: report.significant,
        });
    }

    events.sort_by(|a, b| {
        b.percentage_delta
            .total_cmp(&a.percentage_delta)
            .then_with(|| a.entity_name.cmp(&b.entity_name))
    });
    events
}
