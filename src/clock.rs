use chrono::{Duration, Local, NaiveDateTime, Timelike, Utc};

use crate::models::MissionDay;

pub const LOCAL_OFFSET_HOURS: i64 = 9;
pub const DAY_BOUNDARY_HOUR: u32 = 5;
pub const UTC_DETECTION_TOLERANCE_MINUTES: i64 = 5;

/// Resolve the user's local wall clock. Hosts that run on UTC get the fixed
/// +9h offset applied; hosts already on local time are taken as-is.
pub fn resolve_local(system_now: NaiveDateTime, utc_now: NaiveDateTime) -> NaiveDateTime {
    let drift = (system_now - utc_now).num_seconds().abs();
    if drift <= UTC_DETECTION_TOLERANCE_MINUTES * 60 {
        utc_now + Duration::hours(LOCAL_OFFSET_HOURS)
    } else {
        system_now
    }
}

pub fn mission_day(local: NaiveDateTime) -> MissionDay {
    let date = local.date();
    if local.hour() < DAY_BOUNDARY_HOUR {
        MissionDay(date - Duration::days(1))
    } else {
        MissionDay(date)
    }
}

pub fn now_local() -> NaiveDateTime {
    resolve_local(Local::now().naive_local(), Utc::now().naive_utc())
}

pub fn current_mission_day() -> MissionDay {
    mission_day(now_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn before_five_belongs_to_previous_day() {
        let day = mission_day(at(2026, 3, 10, 4, 59));
        assert_eq!(day.date(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }

    #[test]
    fn five_sharp_starts_the_new_day() {
        let day = mission_day(at(2026, 3, 10, 5, 0));
        assert_eq!(day.date(), NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
    }

    #[test]
    fn early_hours_on_first_of_month_roll_back_across_months() {
        let day = mission_day(at(2026, 3, 1, 0, 30));
        assert_eq!(day.date(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn utc_host_gets_fixed_offset() {
        let utc = at(2026, 3, 10, 1, 0);
        let system = utc + Duration::minutes(2);
        assert_eq!(resolve_local(system, utc), at(2026, 3, 10, 10, 0));
    }

    #[test]
    fn local_host_clock_is_used_unchanged() {
        let utc = at(2026, 3, 10, 1, 0);
        let system = at(2026, 3, 10, 10, 0);
        assert_eq!(resolve_local(system, utc), system);
    }

    #[test]
    fn tolerance_edge_is_still_treated_as_utc() {
        let utc = at(2026, 3, 10, 1, 0);
        let system = utc - Duration::minutes(5);
        assert_eq!(resolve_local(system, utc), at(2026, 3, 10, 10, 0));
        let system = utc + Duration::minutes(6);
        assert_eq!(resolve_local(system, utc), system);
    }
}
