use chrono::{NaiveDate, NaiveDateTime};

use crate::error::SprintError;
use crate::models::{PaceStatus, PaceVerdict, Sprint};

/// Half-width of the on-track band, in kg.
pub const ON_TRACK_BAND: f64 = 0.2;

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn classify(delta: f64) -> PaceStatus {
    if delta < -ON_TRACK_BAND {
        PaceStatus::Ahead
    } else if delta > ON_TRACK_BAND {
        PaceStatus::Behind
    } else {
        PaceStatus::OnTrack
    }
}

/// Compare the smoothed weight against the sprint's linear trajectory.
///
/// Returns `Ok(None)` when the sprint has no weight goal. The trend weight is
/// preferred over `current_weight` so single-day noise does not flip the
/// verdict.
pub fn evaluate(
    sprint: &Sprint,
    now: NaiveDateTime,
    current_weight: f64,
    trend_weight: Option<f64>,
) -> Result<Option<PaceVerdict>, SprintError> {
    let Some((start_weight, target_weight)) = sprint.weight_goal() else {
        return Ok(None);
    };
    if sprint.duration_days <= 0 {
        return Err(SprintError::NonPositiveDuration {
            name: sprint.name.clone(),
            duration_days: sprint.duration_days,
        });
    }
    if start_weight == target_weight {
        return Err(SprintError::NoWeightChange {
            name: sprint.name.clone(),
            weight: start_weight,
        });
    }

    let today = now.date();
    let duration = sprint.duration_days as f64;
    let day_index = days_between(sprint.start_date, today).max(0);
    let days_remaining = days_between(today, sprint.end_date).max(0);

    let daily_target = (start_weight - target_weight) / duration;
    let expected_weight = start_weight - daily_target * day_index as f64;
    let pace_weight = trend_weight.unwrap_or(current_weight);
    let delta = pace_weight - expected_weight;

    let remaining_loss = pace_weight - target_weight;
    let required_daily_pace = remaining_loss / days_remaining.max(1) as f64;
    let progress_pct = (day_index as f64 / duration * 100.0).clamp(0.0, 100.0);

    Ok(Some(PaceVerdict {
        day_index,
        days_remaining,
        progress_pct,
        expected_weight,
        pace_weight,
        delta,
        status: classify(delta),
        required_daily_pace,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn sprint(start_weight: Option<f64>, target_weight: Option<f64>, duration_days: i64) -> Sprint {
        let start_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        Sprint {
            sprint_id: Uuid::new_v4(),
            name: "Spring cut".to_string(),
            start_date,
            end_date: start_date + Duration::days(duration_days),
            duration_days,
            start_weight,
            target_weight,
        }
    }

    fn on_day(sprint: &Sprint, index: i64) -> NaiveDateTime {
        (sprint.start_date + Duration::days(index))
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn dead_zone_boundaries() {
        // expected weight 80.0 on day 0
        let sprint = sprint(Some(80.0), Some(70.0), 20);
        let now = on_day(&sprint, 0);
        let status = |pace: f64| {
            evaluate(&sprint, now, 0.0, Some(pace))
                .unwrap()
                .unwrap()
                .status
        };
        assert_eq!(status(79.79), PaceStatus::Ahead);
        assert_eq!(status(79.81), PaceStatus::OnTrack);
        assert_eq!(status(80.0), PaceStatus::OnTrack);
        assert_eq!(status(80.21), PaceStatus::Behind);
    }

    #[test]
    fn mid_sprint_scenario() {
        let sprint = sprint(Some(100.0), Some(90.0), 20);
        let verdict = evaluate(&sprint, on_day(&sprint, 10), 96.0, Some(94.5))
            .unwrap()
            .unwrap();

        assert_eq!(verdict.day_index, 10);
        assert_eq!(verdict.days_remaining, 10);
        assert!((verdict.expected_weight - 95.0).abs() < 1e-9);
        assert_eq!(verdict.pace_weight, 94.5);
        assert!((verdict.delta + 0.5).abs() < 1e-9);
        assert_eq!(verdict.status, PaceStatus::Ahead);
        assert!((verdict.required_daily_pace - 0.45).abs() < 1e-9);
        assert!((verdict.progress_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_current_weight_without_trend() {
        let sprint = sprint(Some(100.0), Some(90.0), 20);
        let verdict = evaluate(&sprint, on_day(&sprint, 10), 96.0, None)
            .unwrap()
            .unwrap();
        assert_eq!(verdict.pace_weight, 96.0);
        assert_eq!(verdict.status, PaceStatus::Behind);
    }

    #[test]
    fn before_start_and_after_end_are_clamped() {
        let sprint = sprint(Some(100.0), Some(90.0), 20);

        let early = evaluate(&sprint, on_day(&sprint, -3), 100.0, None)
            .unwrap()
            .unwrap();
        assert_eq!(early.day_index, 0);
        assert_eq!(early.progress_pct, 0.0);
        assert_eq!(early.expected_weight, 100.0);

        let late = evaluate(&sprint, on_day(&sprint, 25), 91.0, Some(91.0))
            .unwrap()
            .unwrap();
        assert_eq!(late.days_remaining, 0);
        assert_eq!(late.progress_pct, 100.0);
        assert!((late.required_daily_pace - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overshooting_target_gives_negative_required_pace() {
        let sprint = sprint(Some(100.0), Some(90.0), 20);
        let verdict = evaluate(&sprint, on_day(&sprint, 15), 89.0, Some(89.0))
            .unwrap()
            .unwrap();
        assert!(verdict.required_daily_pace < 0.0);
        assert_eq!(verdict.status, PaceStatus::Ahead);
    }

    #[test]
    fn missing_goal_yields_none() {
        let sprint = sprint(Some(100.0), None, 20);
        assert_eq!(evaluate(&sprint, on_day(&sprint, 1), 99.0, None).unwrap(), None);
    }

    #[test]
    fn degenerate_sprints_fail_fast() {
        let zero = sprint(Some(100.0), Some(90.0), 0);
        assert!(matches!(
            evaluate(&zero, on_day(&zero, 0), 99.0, None),
            Err(SprintError::NonPositiveDuration { duration_days: 0, .. })
        ));

        let flat = sprint(Some(90.0), Some(90.0), 20);
        assert!(matches!(
            evaluate(&flat, on_day(&flat, 0), 90.0, None),
            Err(SprintError::NoWeightChange { .. })
        ));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let sprint = sprint(Some(100.0), Some(90.0), 20);
        let now = on_day(&sprint, 7);
        let first = evaluate(&sprint, now, 97.3, Some(96.81)).unwrap();
        let second = evaluate(&sprint, now, 97.3, Some(96.81)).unwrap();
        assert_eq!(first, second);
    }
}
