//! Temporal Normalizer
//!
//! Turns fuzzy date and time phrases into absolute tenant-local values.
//! "Today" is always the tenant's civil date, computed once per request by
//! the caller, and every rule below is plain calendar arithmetic on it.
//!
//! Date rules, first match wins:
//! - ISO `YYYY-MM-DD` (taken literally, even if already past)
//! - numeric `M/D[/YY]`
//! - month name first (`Sep 12`, `September 12th, 2026`) or day first (`12 Sep`)
//! - `day after tomorrow`, `tomorrow`, `today` / `tonight`, whichever comes first
//! - `weekend`: the first Saturday at or after tomorrow
//! - weekday names: first occurrence at or after tomorrow; `this <day>` may
//!   resolve to today
//!
//! Without an explicit year a date that already passed rolls to next year.
//! An explicit year is never corrected; the caller rejects past dates.
//!
//! Time rules: `3pm`, `3:30 pm`, `noon`, `midnight`, `15:30`, `3 o'clock`,
//! and a bare `at 15`. A bare hour has no meridiem and is read as 24-hour.

use once_cell::sync::Lazy;
use regex::Regex;

use receptionist_core::civil::month_from_name;
use receptionist_core::{CivilDate, ClockTime, Weekday};

const MONTH_ALT: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b").unwrap());

static MONTH_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?",
        MONTH_ALT
    ))
    .unwrap()
});

static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({})\b\.?(?:,?\s+(\d{{4}})\b)?",
        MONTH_ALT
    ))
    .unwrap()
});

static DAY_AFTER_TOMORROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bday\s+after\s+(?:tomorrow|tmrw|tmr)\b").unwrap());

static TOMORROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:tomorrow|tmrw|tmr|tomorow|2morrow)\b").unwrap());

static TODAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:today|tonight|tonite)\b").unwrap());

static WEEKEND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bweekend\b").unwrap());

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(this|next)\s+)?(sun(?:day)?|mon(?:day)?|tue(?:s|sday)?|wed(?:s|nesday)?|thu(?:r|rs|rsday)?|fri(?:day)?|sat(?:urday)?)\b",
    )
    .unwrap()
});

static MERIDIEM_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?\s?m\b\.?").unwrap()
});

static NOON_MIDNIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(noon|midday|midnight)\b").unwrap());

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());

static OCLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*o'?\s?clock\b").unwrap());

static BARE_HOUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:at|@)\s*(\d{1,2})\b").unwrap());

/// Resolve the first date phrase in `text` against the tenant-local `today`.
///
/// Returns `None` when nothing recognizable is present; the slot stays
/// unfilled and the sender is asked.
pub fn normalize_date(text: &str, today: CivilDate) -> Option<CivilDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return CivilDate::new(year, month, day);
    }

    if let Some(caps) = NUMERIC_DATE.captures(text) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(y) => Some(expand_year(y.as_str())?),
            None => None,
        };
        return resolve_month_day(month, day, year, today);
    }

    if let Some(caps) = MONTH_FIRST.captures(text) {
        let month = month_from_name(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        return resolve_month_day(month, day, year, today);
    }

    if let Some(caps) = DAY_FIRST.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_from_name(&caps[2])?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        return resolve_month_day(month, day, year, today);
    }

    // "today or tomorrow" means today: earliest relative phrase wins
    let relative = [(&DAY_AFTER_TOMORROW, 2), (&TOMORROW, 1), (&TODAY, 0)]
        .into_iter()
        .filter_map(|(pattern, offset)| pattern.find(text).map(|m| (m.start(), offset)))
        .min_by_key(|(start, _)| *start);
    if let Some((_, offset)) = relative {
        return Some(today.add_days(offset));
    }

    if WEEKEND.is_match(text) {
        return Some(next_on_or_after(today.add_days(1), Weekday::Saturday));
    }

    if let Some(caps) = WEEKDAY.captures(text) {
        let target = Weekday::parse(&caps[2])?;
        let qualifier = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let start = match qualifier.as_deref() {
            Some("this") => today,
            _ => today.add_days(1),
        };
        return Some(next_on_or_after(start, target));
    }

    None
}

/// Resolve the first clock-time phrase in `text`.
pub fn normalize_time(text: &str) -> Option<ClockTime> {
    if let Some(caps) = MERIDIEM_TIME.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = caps[3].eq_ignore_ascii_case("p");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return ClockTime::new(hour, minute);
    }

    if let Some(caps) = NOON_MIDNIGHT.captures(text) {
        return match caps[1].to_ascii_lowercase().as_str() {
            "midnight" => ClockTime::new(0, 0),
            _ => ClockTime::new(12, 0),
        };
    }

    if let Some(caps) = CLOCK_TIME.captures(text) {
        return ClockTime::new(caps[1].parse().ok()?, caps[2].parse().ok()?);
    }

    if let Some(caps) = OCLOCK.captures(text) {
        return ClockTime::new(caps[1].parse().ok()?, 0);
    }

    for caps in BARE_HOUR.captures_iter(text) {
        let whole = caps.get(0)?;
        // "at 10/12" is a date, "at 3:30" was handled above
        let next = text[whole.end()..].chars().next();
        if matches!(next, Some('/') | Some(':') | Some('-')) {
            continue;
        }
        return ClockTime::new(caps[1].parse().ok()?, 0);
    }

    None
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

/// Month/day with optional explicit year. Without a year the current year is
/// assumed unless that date already passed, then next year.
fn resolve_month_day(month: u32, day: u32, year: Option<i32>, today: CivilDate) -> Option<CivilDate> {
    if let Some(year) = year {
        return CivilDate::new(year, month, day);
    }
    match CivilDate::new(today.year, month, day) {
        Some(date) if date >= today => Some(date),
        _ => CivilDate::new(today.year + 1, month, day),
    }
}

fn next_on_or_after(start: CivilDate, target: Weekday) -> CivilDate {
    start.add_days(start.weekday().days_until(target))
}

/// True if `text` carries any date or time phrase.
pub fn mentions_datetime(text: &str, today: CivilDate) -> bool {
    normalize_date(text, today).is_some() || normalize_time(text).is_some()
}
