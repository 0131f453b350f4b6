use crate::errors::ScoringError;
use crate::models::{ActivityInput, ScoreBreakdown};

/// Cap on the rounds category, in points.
pub const ROUNDS_CAP: i32 = 25;

/// Upper bound (inclusive) of one score band and the points it awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub up_to: i32,
    pub points: i32,
}

/// Ordered step function from minutes to points. Anything above the last band
/// lands in `above`.
#[derive(Debug, Clone, Copy)]
pub struct BandTable {
    pub bands: &'static [Band],
    pub above: i32,
}

impl BandTable {
    pub fn points(&self, minutes: i32) -> i32 {
        self.bands
            .iter()
            .find(|band| minutes <= band.up_to)
            .map(|band| band.points)
            .unwrap_or(self.above)
    }
}

pub const READING_BANDS: BandTable = BandTable {
    bands: &[
        Band { up_to: 0, points: 0 },
        Band { up_to: 15, points: 7 },
        Band { up_to: 30, points: 15 },
        Band { up_to: 45, points: 20 },
    ],
    above: 30,
};

pub const LISTENING_BANDS: BandTable = BandTable {
    bands: &[
        Band { up_to: 0, points: 0 },
        Band { up_to: 15, points: 7 },
        Band { up_to: 30, points: 15 },
        Band { up_to: 45, points: 20 },
    ],
    above: 30,
};

pub const SERVICE_BANDS: BandTable = BandTable {
    bands: &[
        Band { up_to: 0, points: 0 },
        Band { up_to: 15, points: 5 },
        Band { up_to: 30, points: 8 },
        Band { up_to: 45, points: 12 },
    ],
    above: 15,
};

/// Per-round weights in half points, earliest bracket first (2.5, 2.0, 1.5, 1.0).
const ROUND_WEIGHTS_HALVES: [i64; 4] = [5, 4, 3, 2];

pub fn compute_score(input: &ActivityInput) -> Result<ScoreBreakdown, ScoringError> {
    let fields = [
        ("early_session", input.early_session),
        ("before_cutoff", input.before_cutoff),
        ("mid_morning", input.mid_morning),
        ("late_morning", input.late_morning),
        ("reading_minutes", input.reading_minutes),
        ("listening_minutes", input.listening_minutes),
        ("service_minutes", input.service_minutes),
    ];
    for (field, value) in fields {
        if value < 0 {
            return Err(ScoringError::InvalidInput {
                field,
                value: i64::from(value),
            });
        }
    }

    let rounds = [
        input.early_session,
        input.before_cutoff,
        input.mid_morning,
        input.late_morning,
    ];
    let total_rounds = rounds.iter().fold(0i32, |acc, r| acc.saturating_add(*r));
    let score_a = rounds_score(&rounds);
    let score_b = READING_BANDS.points(input.reading_minutes);
    let score_c = LISTENING_BANDS.points(input.listening_minutes);
    let score_d = SERVICE_BANDS.points(input.service_minutes);

    Ok(ScoreBreakdown {
        total_rounds,
        score_a,
        score_b,
        score_c,
        score_d,
        total_score: score_a + score_b + score_c + score_d,
    })
}

/// Weighted rounds, capped, then rounded half up. Works in half points so the
/// rounding is exact.
fn rounds_score(rounds: &[i32; 4]) -> i32 {
    let halves: i64 = rounds
        .iter()
        .zip(ROUND_WEIGHTS_HALVES)
        .map(|(count, weight)| i64::from(*count) * weight)
        .sum();
    let capped = halves.min(i64::from(ROUNDS_CAP) * 2);
    ((capped + 1) / 2) as i32
}
