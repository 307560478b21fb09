use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::{DailyWeight, DailyWeightSeries, MissionDay, Observation};

pub const DEFAULT_ALPHA: f64 = 0.35;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 21;

/// First date of the closed window `[end - lookback_days, end]`.
pub fn window_start(end: MissionDay, lookback_days: i64) -> NaiveDate {
    end.date() - Duration::days(lookback_days.max(0))
}

/// Collapse a raw log to one weight per calendar date inside the lookback
/// window. Within a date the latest intra-day time wins; rows without a time
/// lose to rows with one, and ties go to the later row in input order.
pub fn reduce(
    observations: &[Observation],
    end: MissionDay,
    lookback_days: i64,
) -> DailyWeightSeries {
    let start = window_start(end, lookback_days);
    let end = end.date();
    let mut latest: BTreeMap<NaiveDate, (Option<NaiveTime>, usize, f64)> = BTreeMap::new();

    for (position, observation) in observations.iter().enumerate() {
        if observation.date < start || observation.date > end {
            continue;
        }
        let weight = match observation.weight {
            Some(value) if value.is_finite() => value,
            _ => continue,
        };

        let newer = match latest.get(&observation.date) {
            Some(&(time, seen_at, _)) => (time, seen_at) < (observation.time, position),
            None => true,
        };
        if newer {
            latest.insert(observation.date, (observation.time, position, weight));
        }
    }

    latest
        .into_iter()
        .map(|(date, (_, _, weight))| DailyWeight { date, weight })
        .collect()
}

pub fn ewma(weights: &[f64], alpha: f64) -> Option<f64> {
    let (first, rest) = weights.split_first()?;
    let mut mean = *first;
    for value in rest {
        mean = alpha * value + (1.0 - alpha) * mean;
    }
    Some(mean)
}

pub fn series_weights(series: &[DailyWeight]) -> Vec<f64> {
    series.iter().map(|day| day.weight).collect()
}
