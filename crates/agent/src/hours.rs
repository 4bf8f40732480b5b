//! Opening-hours validation

use receptionist_core::{CivilDate, CivilDateTime, ClockTime, DayWindow, Weekday, WeeklyHours};

/// Result of checking a requested slot against the weekly hours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursCheck {
    Open,
    /// No window configured for that weekday
    ClosedDay { day: Weekday },
    OutsideWindow { day: Weekday, window: DayWindow },
}

impl HoursCheck {
    pub fn is_open(&self) -> bool {
        matches!(self, HoursCheck::Open)
    }
}

/// Both window ends are inclusive: a time equal to the close time passes.
pub fn check_hours(hours: &WeeklyHours, date: CivilDate, time: ClockTime) -> HoursCheck {
    let day = date.weekday();
    match hours.window(day) {
        None => HoursCheck::ClosedDay { day },
        Some(window) if window.contains(time) => HoursCheck::Open,
        Some(window) => HoursCheck::OutsideWindow { day, window: *window },
    }
}

pub fn is_open_at(hours: &WeeklyHours, now: &CivilDateTime) -> bool {
    check_hours(hours, now.date, now.time).is_open()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekday_hours() -> WeeklyHours {
        let window = DayWindow::parse("09:00-18:00").unwrap();
        [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday, Weekday::Friday]
            .into_iter()
            .fold(WeeklyHours::new(), |hours, day| hours.with_day(day, window))
    }

    fn t(raw: &str) -> ClockTime {
        raw.parse().unwrap()
    }

    #[test]
    fn test_close_time_is_inclusive() {
        let hours = weekday_hours();
        let thursday = CivilDate::new(2026, 10, 15).unwrap();
        assert_eq!(check_hours(&hours, thursday, t("18:00")), HoursCheck::Open);
        assert_eq!(check_hours(&hours, thursday, t("09:00")), HoursCheck::Open);
        assert!(matches!(
            check_hours(&hours, thursday, t("18:01")),
            HoursCheck::OutsideWindow { day: Weekday::Thursday, .. }
        ));
        assert!(!check_hours(&hours, thursday, t("08:59")).is_open());
    }

    #[test]
    fn test_unconfigured_day_is_closed() {
        let saturday = CivilDate::new(2026, 10, 17).unwrap();
        assert_eq!(
            check_hours(&weekday_hours(), saturday, t("12:00")),
            HoursCheck::ClosedDay { day: Weekday::Saturday }
        );
        assert!(!check_hours(&WeeklyHours::new(), saturday, t("12:00")).is_open());
    }

    #[test]
    fn test_is_open_at() {
        let hours = weekday_hours();
        assert!(is_open_at(&hours, &"2026-10-15 14:00".parse().unwrap()));
        assert!(!is_open_at(&hours, &"2026-10-15 19:30".parse().unwrap()));
    }
}
