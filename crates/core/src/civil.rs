//! Civil calendar arithmetic
//!
//! Dates and clock times are plain calendar values in a tenant's local wall
//! clock. All arithmetic (weekday lookup, day addition, month lengths) is
//! integer math over a day count, so results never depend on the host
//! timezone database. The only instant-to-civil conversion lives in
//! [`CivilDateTime::from_instant`], which is called once per request.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Days from 1970-01-01 to the given proleptic Gregorian date.
pub fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year as i64 - 1 } else { year as i64 };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = month as i64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
pub fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year as i32, month as u32, day as u32)
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Month number from an English month name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    let month = match lower.as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

const MONTH_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Day of the week, Sunday first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// 0 = Sunday .. 6 = Saturday
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Weekday {
        Self::ALL[index % 7]
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    /// Parse a weekday name or common abbreviation ("tues", "thurs").
    pub fn parse(name: &str) -> Option<Weekday> {
        let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
        let day = match lower.as_str() {
            "sun" | "sunday" => Weekday::Sunday,
            "mon" | "monday" => Weekday::Monday,
            "tue" | "tues" | "tuesday" => Weekday::Tuesday,
            "wed" | "weds" | "wednesday" => Weekday::Wednesday,
            "thu" | "thur" | "thurs" | "thursday" => Weekday::Thursday,
            "fri" | "friday" => Weekday::Friday,
            "sat" | "saturday" => Weekday::Saturday,
            _ => return None,
        };
        Some(day)
    }

    /// Days to move forward from `self` to reach `target` (0..=6).
    pub fn days_until(&self, target: Weekday) -> i64 {
        (target.index() as i64 - self.index() as i64).rem_euclid(7)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A calendar date in some tenant's local calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CivilDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CivilDate {
    /// Build a validated date.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    pub fn from_days(days: i64) -> Self {
        let (year, month, day) = civil_from_days(days);
        Self { year, month, day }
    }

    pub fn to_days(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }

    /// Closed-form day of week; 1970-01-01 was a Thursday.
    pub fn weekday(&self) -> Weekday {
        Weekday::from_index((self.to_days() + 4).rem_euclid(7) as usize)
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self::from_days(self.to_days() + days)
    }

    pub fn days_until(&self, other: &CivilDate) -> i64 {
        other.to_days() - self.to_days()
    }

    /// Short human form used in replies, e.g. "Fri, Oct 16".
    pub fn describe(&self) -> String {
        format!(
            "{}, {} {}",
            self.weekday().short_name(),
            MONTH_SHORT[(self.month as usize).saturating_sub(1) % 12],
            self.day
        )
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CivilDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("not a YYYY-MM-DD date: {}", s));
        let mut parts = s.trim().splitn(3, '-');
        let year = parts.next().and_then(|p| p.parse::<i32>().ok()).ok_or_else(invalid)?;
        let month = parts.next().and_then(|p| p.parse::<u32>().ok()).ok_or_else(invalid)?;
        let day = parts.next().and_then(|p| p.parse::<u32>().ok()).ok_or_else(invalid)?;
        CivilDate::new(year, month, day).ok_or_else(invalid)
    }
}

/// A wall-clock time of day, minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    pub fn minutes_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    /// Minutes of day rounded to the nearest quarter hour. Remainders below
    /// 8 round down. 23:53 and later round to 1440.
    pub fn rounded_quarter_minutes(&self) -> u32 {
        let total = self.minutes_of_day();
        let rem = total % 15;
        if rem < 8 {
            total - rem
        } else {
            total + 15 - rem
        }
    }

    /// "3:00 PM" style rendering for replies.
    pub fn describe(&self) -> String {
        let (hour, meridiem) = match self.hour {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        format!("{}:{:02} {}", hour, self.minute, meridiem)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("not an HH:MM time: {}", s));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        ClockTime::new(hour, minute).ok_or_else(invalid)
    }
}

/// Tenant-local date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CivilDateTime {
    pub date: CivilDate,
    pub time: ClockTime,
}

impl CivilDateTime {
    pub fn new(date: CivilDate, time: ClockTime) -> Self {
        Self { date, time }
    }

    /// Convert an instant into the wall clock of the named IANA zone.
    ///
    /// An unknown zone name falls back to UTC so a misconfigured tenant still
    /// gets answers; the fallback is logged.
    pub fn from_instant(instant: DateTime<Utc>, timezone: &str) -> Self {
        match timezone.parse::<Tz>() {
            Ok(zone) => {
                let local = instant.with_timezone(&zone);
                Self::from_parts(local.year(), local.month(), local.day(), local.hour(), local.minute())
            },
            Err(e) => {
                tracing::warn!(timezone = %timezone, error = %e, "Unknown timezone, using UTC");
                Self::from_parts(
                    instant.year(),
                    instant.month(),
                    instant.day(),
                    instant.hour(),
                    instant.minute(),
                )
            },
        }
    }

    fn from_parts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self {
            date: CivilDate { year, month, day },
            time: ClockTime { hour, minute },
        }
    }

    /// Whole minutes elapsed from `earlier` to `self` (negative if `earlier`
    /// is actually later).
    pub fn minutes_since(&self, earlier: &CivilDateTime) -> i64 {
        (self.date.to_days() - earlier.date.to_days()) * 1_440
            + self.time.minutes_of_day() as i64
            - earlier.time.minutes_of_day() as i64
    }
}

impl fmt::Display for CivilDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

impl FromStr for CivilDateTime {
    type Err = Error;

    /// Accepts "YYYY-MM-DD HH:MM" and "YYYY-MM-DDTHH:MM[:SS]".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (date, time) = s
            .split_once(|c: char| c == ' ' || c == 'T')
            .ok_or_else(|| Error::InvalidInput(format!("not a local date-time: {}", s)))?;
        let time = match time.match_indices(':').nth(1) {
            Some((idx, _)) => &time[..idx],
            None => time,
        };
        Ok(Self {
            date: date.parse()?,
            time: time.parse()?,
        })
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(CivilDate);
serde_via_str!(ClockTime);
serde_via_str!(CivilDateTime);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> CivilDate {
        CivilDate::new(y, m, d).unwrap()
    }

    #[test]
    fn test_epoch_and_round_trip() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        for days in [-800_000_i64, -1, 0, 59, 60, 10_957, 20_000, 400_000] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days);
        }
    }

    #[test]
    fn test_weekday_is_intrinsic() {
        assert_eq!(date(1970, 1, 1).weekday(), Weekday::Thursday);
        assert_eq!(date(2000, 1, 1).weekday(), Weekday::Saturday);
        assert_eq!(date(2024, 2, 29).weekday(), Weekday::Thursday);
        assert_eq!(date(2026, 10, 15).weekday(), Weekday::Thursday);
        assert_eq!(date(1969, 12, 31).weekday(), Weekday::Wednesday);
    }

    #[test]
    fn test_leap_years_and_month_lengths() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2026));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 4), 30);
        assert!(CivilDate::new(2025, 2, 29).is_none());
        assert!(CivilDate::new(2025, 13, 1).is_none());
    }

    #[test]
    fn test_add_days_crosses_boundaries() {
        assert_eq!(date(2024, 2, 28).add_days(1), date(2024, 2, 29));
        assert_eq!(date(2025, 2, 28).add_days(1), date(2025, 3, 1));
        assert_eq!(date(2025, 12, 31).add_days(1), date(2026, 1, 1));
        assert_eq!(date(2026, 1, 1).add_days(-1), date(2025, 12, 31));
    }

    #[test]
    fn test_parse_and_display() {
        let d: CivilDate = "2026-10-16".parse().unwrap();
        assert_eq!(d, date(2026, 10, 16));
        assert_eq!(d.to_string(), "2026-10-16");
        assert!("2026-02-30".parse::<CivilDate>().is_err());

        let t: ClockTime = "9:05".parse().unwrap();
        assert_eq!(t.to_string(), "09:05");
        assert!("24:00".parse::<ClockTime>().is_err());

        let dt: CivilDateTime = "2026-10-16T15:00:00".parse().unwrap();
        assert_eq!(dt.to_string(), "2026-10-16 15:00");
    }

    #[test]
    fn test_serde_as_strings() {
        let dt: CivilDateTime = "2026-10-16 15:30".parse().unwrap();
        let json = serde_json::to_string(&dt).unwrap();
        assert_eq!(json, "\"2026-10-16 15:30\"");
        let back: CivilDateTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dt);
    }

    #[test]
    fn test_quarter_rounding() {
        let t = |h, m| ClockTime::new(h, m).unwrap().rounded_quarter_minutes();
        assert_eq!(t(15, 7), 15 * 60);
        assert_eq!(t(15, 8), 15 * 60 + 15);
        assert_eq!(t(14, 53), 15 * 60);
        assert_eq!(t(23, 55), 1_440);
    }

    #[test]
    fn test_describe() {
        assert_eq!(date(2026, 10, 16).describe(), "Fri, Oct 16");
        assert_eq!(ClockTime::new(15, 0).unwrap().describe(), "3:00 PM");
        assert_eq!(ClockTime::new(0, 30).unwrap().describe(), "12:30 AM");
        assert_eq!(ClockTime::new(12, 0).unwrap().describe(), "12:00 PM");
    }

    #[test]
    fn test_from_instant_across_utc_midnight() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 16, 2, 30, 0).unwrap();

        let ny = CivilDateTime::from_instant(instant, "America/New_York");
        assert_eq!(ny.to_string(), "2026-10-15 22:30");

        let tokyo = CivilDateTime::from_instant(instant, "Asia/Tokyo");
        assert_eq!(tokyo.to_string(), "2026-10-16 11:30");

        let fallback = CivilDateTime::from_instant(instant, "Not/AZone");
        assert_eq!(fallback.to_string(), "2026-10-16 02:30");
    }

    #[test]
    fn test_minutes_since() {
        let a: CivilDateTime = "2026-10-15 23:30".parse().unwrap();
        let b: CivilDateTime = "2026-10-16 00:15".parse().unwrap();
        assert_eq!(b.minutes_since(&a), 45);
        assert_eq!(a.minutes_since(&b), -45);
    }

    #[test]
    fn test_weekday_parsing() {
        assert_eq!(Weekday::parse("Thurs"), Some(Weekday::Thursday));
        assert_eq!(Weekday::parse("sat."), Some(Weekday::Saturday));
        assert_eq!(Weekday::parse("someday"), None);
        assert_eq!(Weekday::Friday.days_until(Weekday::Monday), 3);
        assert_eq!(Weekday::Monday.days_until(Weekday::Monday), 0);
        assert_eq!(month_from_name("Sept"), Some(9));
    }
}
