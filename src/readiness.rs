use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::models::{DailyVitals, HealthEntry};

pub const HRV_RED_BELOW: f64 = 30.0;
pub const HRV_YELLOW_BELOW: f64 = 45.0;
pub const RHR_RED_ABOVE: f64 = 75.0;
pub const RHR_YELLOW_ABOVE: f64 = 65.0;
const SCORE_PENALTY_PER_KG: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Signal {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::Green => "keep it up",
            Signal::Yellow => "caution",
            Signal::Red => "achtung",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightScore {
    pub score: u8,
    pub signal: Signal,
    pub grade: Option<char>,
    pub gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readiness {
    pub hrv: Option<Signal>,
    pub rhr: Option<Signal>,
    pub weight: Option<WeightScore>,
    /// `None` when the latest row carries neither HRV nor RHR.
    pub condition: Option<Signal>,
}

/// Readings are compared as whole numbers, fractions are dropped.
pub fn hrv_signal(hrv: f64) -> Signal {
    let hrv = hrv.trunc();
    if hrv < HRV_RED_BELOW {
        Signal::Red
    } else if hrv < HRV_YELLOW_BELOW {
        Signal::Yellow
    } else {
        Signal::Green
    }
}

pub fn rhr_signal(rhr: f64) -> Signal {
    let rhr = rhr.trunc();
    if rhr > RHR_RED_ABOVE {
        Signal::Red
    } else if rhr > RHR_YELLOW_ABOVE {
        Signal::Yellow
    } else {
        Signal::Green
    }
}

/// Distance-to-target score with a small bonus for moving down since the
/// previous day and a penalty for moving up or standing still.
pub fn weight_score(current: f64, previous: f64, target: f64) -> WeightScore {
    let gap = (current - target).abs();
    if current <= 0.0 {
        return score_from(0, gap);
    }

    let previous = if previous > 0.0 { previous } else { current };
    let trend = if current < previous {
        3.0
    } else if current > previous {
        -3.0
    } else {
        -1.0
    };
    let base = 100.0 - gap * SCORE_PENALTY_PER_KG;
    let score = (base + trend).trunc().clamp(0.0, 100.0) as u8;
    score_from(score, gap)
}

fn score_from(score: u8, gap: f64) -> WeightScore {
    let (signal, grade) = match score {
        0..=59 => (Signal::Red, Some('F')),
        60..=69 => (Signal::Red, Some('D')),
        _ => (Signal::Green, None),
    };
    WeightScore {
        score,
        signal,
        grade,
        gap,
    }
}

/// Worst of the two cardiovascular signals, or `None` without readings.
pub fn condition(hrv: Option<Signal>, rhr: Option<Signal>) -> Option<Signal> {
    hrv.into_iter().chain(rhr).max()
}

/// Worst-case daily aggregate (lowest HRV, highest RHR, highest weight) for
/// the most recent `days` dates, oldest first.
pub fn daily_vitals(entries: &[HealthEntry], days: usize) -> Vec<DailyVitals> {
    let mut by_date: BTreeMap<NaiveDate, DailyVitals> = BTreeMap::new();

    for entry in entries {
        let vitals = by_date.entry(entry.date).or_insert(DailyVitals {
            date: entry.date,
            hrv_min: None,
            rhr_max: None,
            weight_max: None,
        });
        vitals.hrv_min = fold(vitals.hrv_min, entry.hrv, f64::min);
        vitals.rhr_max = fold(vitals.rhr_max, entry.rhr, f64::max);
        vitals.weight_max = fold(vitals.weight_max, entry.weight, f64::max);
    }

    let values: Vec<DailyVitals> = by_date.into_values().collect();
    let skip = values.len().saturating_sub(days);
    values.into_iter().skip(skip).collect()
}

fn fold(acc: Option<f64>, value: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (acc, value.filter(|v| v.is_finite())) {
        (Some(a), Some(v)) => Some(pick(a, v)),
        (None, v) => v,
        (a, None) => a,
    }
}

/// Morning check-in: signals from the latest log row, weight score against
/// the previous day's worst-case weight.
pub fn assess(entries: &[HealthEntry], target_weight: Option<f64>) -> Option<Readiness> {
    let latest = entries.last()?;
    let hrv = latest.hrv.map(hrv_signal);
    let rhr = latest.rhr.map(rhr_signal);

    let vitals = daily_vitals(entries, 2);
    let previous = if vitals.len() > 1 {
        vitals[0].weight_max
    } else {
        latest.weight
    };
    let weight = match (latest.weight, target_weight) {
        (Some(current), Some(target)) => {
            Some(weight_score(current, previous.unwrap_or(current), target))
        }
        _ => None,
    };

    Some(Readiness {
        hrv,
        rhr,
        weight,
        condition: condition(hrv, rhr),
    })
}
