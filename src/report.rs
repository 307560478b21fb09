use std::fmt::Write;

use crate::models::{DailyVitals, MissionDay, PaceVerdict, Sprint, TrendRecord};
use crate::readiness::Readiness;

const NO_DATA: &str = "Not enough data yet.";

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "-".to_string(),
    }
}

pub fn build_report(
    day: MissionDay,
    sprint: Option<&Sprint>,
    verdict: Option<&PaceVerdict>,
    trend: Option<&TrendRecord>,
    readiness: Option<&Readiness>,
    vitals: &[DailyVitals],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Mission Status Report");
    let _ = writeln!(output, "Mission day {day}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sprint Pace");

    match (sprint, verdict) {
        (Some(sprint), Some(verdict)) => {
            let _ = writeln!(
                output,
                "- {} ({} to {}), day {} with {} days remaining ({:.0}% elapsed)",
                sprint.name,
                sprint.start_date,
                sprint.end_date,
                verdict.day_index,
                verdict.days_remaining,
                verdict.progress_pct
            );
            let _ = writeln!(
                output,
                "- Status: **{}** (pace {:.2} kg vs expected {:.2} kg, delta {:+.2} kg)",
                verdict.status, verdict.pace_weight, verdict.expected_weight, verdict.delta
            );
            if verdict.required_daily_pace <= 0.0 {
                let _ = writeln!(output, "- Target already reached; hold the line.");
            } else {
                let _ = writeln!(
                    output,
                    "- Required pace: {:.2} kg/day",
                    verdict.required_daily_pace
                );
            }
        }
        (Some(sprint), None) => {
            let _ = writeln!(output, "- {} has no weight goal defined.", sprint.name);
        }
        (None, _) => {
            let _ = writeln!(output, "No active sprint.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");
    match trend {
        Some(trend) => {
            let _ = writeln!(
                output,
                "- Trend weight {:.2} kg from {} daily samples ({} to {}, alpha {})",
                trend.trend_weight,
                trend.sample_count,
                trend.window_start,
                trend.window_end,
                trend.alpha
            );
            let _ = writeln!(
                output,
                "- Frozen at {}",
                trend.computed_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => {
            let _ = writeln!(output, "{NO_DATA}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Readiness");
    match readiness {
        Some(readiness) => {
            let label = |signal: Option<crate::readiness::Signal>| {
                signal.map_or_else(|| "-".to_string(), |s| s.to_string())
            };
            match readiness.condition {
                Some(condition) => {
                    let _ = writeln!(output, "- Condition: **{condition}**");
                }
                None => {
                    let _ = writeln!(output, "- Condition: {NO_DATA}");
                }
            }
            let _ = writeln!(output, "- HRV: {}", label(readiness.hrv));
            let _ = writeln!(output, "- RHR: {}", label(readiness.rhr));
            if let Some(score) = readiness.weight {
                let grade = score.grade.map(|g| format!(", grade {g}")).unwrap_or_default();
                let _ = writeln!(
                    output,
                    "- Weight score: {} ({}{}), {:.1} kg from target",
                    score.score, score.signal, grade, score.gap
                );
            }
        }
        None => {
            let _ = writeln!(output, "{NO_DATA}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Days");
    if vitals.is_empty() {
        let _ = writeln!(output, "{NO_DATA}");
    } else {
        for day in vitals.iter().rev() {
            let _ = writeln!(
                output,
                "- {}: weight {}, HRV {}, RHR {}",
                day.date,
                fmt_opt(day.weight_max, " kg"),
                fmt_opt(day.hrv_min, " ms"),
                fmt_opt(day.rhr_max, " bpm")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaceStatus;
    use crate::readiness::Signal;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn empty_inputs_render_placeholders() {
        let report = build_report(MissionDay(date(10)), None, None, None, None, &[]);
        assert!(report.contains("Mission day 2026-03-10"));
        assert!(report.contains("No active sprint."));
        assert_eq!(report.matches(NO_DATA).count(), 3);
    }

    #[test]
    fn readiness_without_vitals_does_not_claim_a_condition() {
        let readiness = Readiness {
            hrv: None,
            rhr: None,
            weight: None,
            condition: None,
        };
        let report = build_report(MissionDay(date(10)), None, None, None, Some(&readiness), &[]);
        assert!(report.contains(&format!("- Condition: {NO_DATA}")));
        assert!(!report.contains("keep it up"));
    }

    #[test]
    fn full_report_lists_verdict_and_days() {
        let sprint = Sprint {
            sprint_id: Uuid::new_v4(),
            name: "Spring cut".to_string(),
            start_date: date(1),
            end_date: date(21),
            duration_days: 20,
            start_weight: Some(100.0),
            target_weight: Some(90.0),
        };
        let verdict = PaceVerdict {
            day_index: 10,
            days_remaining: 10,
            progress_pct: 50.0,
            expected_weight: 95.0,
            pace_weight: 94.5,
            delta: -0.5,
            status: PaceStatus::Ahead,
            required_daily_pace: 0.45,
        };
        let trend = TrendRecord {
            mission_day: MissionDay(date(11)),
            trend_weight: 94.5,
            alpha: 0.35,
            lookback_days: 21,
            sample_count: 9,
            window_start: date(1),
            window_end: date(11),
            computed_at: Utc::now(),
        };
        let readiness = Readiness {
            hrv: Some(Signal::Green),
            rhr: Some(Signal::Yellow),
            weight: None,
            condition: Some(Signal::Yellow),
        };
        let vitals = vec![DailyVitals {
            date: date(11),
            hrv_min: Some(48.0),
            rhr_max: None,
            weight_max: Some(94.4),
        }];

        let report = build_report(
            MissionDay(date(11)),
            Some(&sprint),
            Some(&verdict),
            Some(&trend),
            Some(&readiness),
            &vitals,
        );
        assert!(report.contains("Status: **ahead**"));
        assert!(report.contains("Required pace: 0.45 kg/day"));
        assert!(report.contains("9 daily samples"));
        assert!(report.contains("Condition: **caution**"));
        assert!(report.contains("2026-03-11: weight 94.4 kg, HRV 48.0 ms, RHR -"));
        assert!(!report.contains(NO_DATA));
    }
}
