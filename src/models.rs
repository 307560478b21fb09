use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The application's notion of "today": a calendar date whose boundary sits
/// at 05:00 local time. Also the trend cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionDay(pub NaiveDate);

impl MissionDay {
    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn key(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MissionDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for MissionDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(MissionDay)
    }
}

/// One weight reading from the health log. `weight` is `None` when the cell
/// was empty or not a number.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyWeight {
    pub date: NaiveDate,
    pub weight: f64,
}

pub type DailyWeightSeries = Vec<DailyWeight>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub mission_day: MissionDay,
    pub trend_weight: f64,
    pub alpha: f64,
    pub lookback_days: i64,
    pub sample_count: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprint {
    pub sprint_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub start_weight: Option<f64>,
    pub target_weight: Option<f64>,
}

impl Sprint {
    /// Both ends of the weight goal, if the sprint defines one.
    pub fn weight_goal(&self) -> Option<(f64, f64)> {
        match (self.start_weight, self.target_weight) {
            (Some(start), Some(target)) => Some((start, target)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceStatus {
    Ahead,
    OnTrack,
    Behind,
}

impl PaceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaceStatus::Ahead => "ahead",
            PaceStatus::OnTrack => "on_track",
            PaceStatus::Behind => "behind",
        }
    }
}

impl fmt::Display for PaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceVerdict {
    pub day_index: i64,
    pub days_remaining: i64,
    pub progress_pct: f64,
    pub expected_weight: f64,
    pub pace_weight: f64,
    pub delta: f64,
    pub status: PaceStatus,
    pub required_daily_pace: f64,
}

/// A full health-log row. Only `weight` feeds the trend; HRV and RHR feed
/// the readiness signals.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthEntry {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub weight: Option<f64>,
    pub hrv: Option<f64>,
    pub rhr: Option<f64>,
}

impl HealthEntry {
    pub fn observation(&self) -> Observation {
        Observation {
            date: self.date,
            time: self.time,
            weight: self.weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyVitals {
    pub date: NaiveDate,
    pub hrv_min: Option<f64>,
    pub rhr_max: Option<f64>,
    pub weight_max: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_day_key_round_trips_through_string() {
        let day = MissionDay(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!(day.key(), "2026-03-09");
        assert_eq!("2026-03-09".parse::<MissionDay>().unwrap(), day);
    }

    #[test]
    fn weight_goal_requires_both_ends() {
        let mut sprint = Sprint {
            sprint_id: Uuid::new_v4(),
            name: "Spring cut".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 21).unwrap(),
            duration_days: 20,
            start_weight: Some(100.0),
            target_weight: None,
        };
        assert_eq!(sprint.weight_goal(), None);
        sprint.target_weight = Some(90.0);
        assert_eq!(sprint.weight_goal(), Some((100.0, 90.0)));
    }

    #[test]
    fn pace_status_serializes_snake_case() {
        let json = serde_json::to_string(&PaceStatus::OnTrack).unwrap();
        assert_eq!(json, "\"on_track\"");
    }
}
