//! Tenant configuration
//!
//! Read-only from the booking engine's perspective: timezone, weekly open
//! windows and the service catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::civil::{ClockTime, Weekday};
use crate::error::Error;

/// Open window for one day, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub open: ClockTime,
    pub close: ClockTime,
}

impl DayWindow {
    pub fn new(open: ClockTime, close: ClockTime) -> Self {
        Self { open, close }
    }

    /// A time equal to the close time is still inside the window.
    pub fn contains(&self, time: ClockTime) -> bool {
        self.open <= time && time <= self.close
    }

    pub fn describe(&self) -> String {
        format!("{}-{}", self.open.describe(), self.close.describe())
    }

    /// Parse "09:00-18:00".
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let (open, close) = raw
            .split_once('-')
            .ok_or_else(|| Error::Configuration(format!("hours window must be HH:MM-HH:MM, got '{}'", raw)))?;
        let window = Self::new(open.trim().parse()?, close.trim().parse()?);
        if window.close < window.open {
            return Err(Error::Configuration(format!("hours window closes before it opens: '{}'", raw)));
        }
        Ok(window)
    }
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.open, self.close)
    }
}

/// Weekly open windows indexed by weekday. A day without a window is closed.
///
/// Deserializes from a map such as `{ mon-fri: "09:00-18:00", sat: "10:00-14:00", sun: closed }`.
/// Range keys are applied first so a single-day key can override part of a range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct WeeklyHours {
    days: [Option<DayWindow>; 7],
}

impl WeeklyHours {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, day: Weekday, window: DayWindow) -> Self {
        self.days[day.index()] = Some(window);
        self
    }

    pub fn window(&self, day: Weekday) -> Option<&DayWindow> {
        self.days[day.index()].as_ref()
    }

    pub fn is_always_closed(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    /// One line per day, Monday first.
    pub fn describe(&self) -> String {
        let order = [1, 2, 3, 4, 5, 6, 0];
        order
            .iter()
            .map(|&i| {
                let day = Weekday::from_index(i);
                match self.window(day) {
                    Some(w) => format!("{} {}", day.short_name(), w.describe()),
                    None => format!("{} closed", day.short_name()),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_day_key(key: &str) -> Result<Vec<Weekday>, Error> {
    let lower = key.trim().to_ascii_lowercase();
    match lower.as_str() {
        "daily" | "everyday" => return Ok(Weekday::ALL.to_vec()),
        "weekdays" => return parse_day_key("mon-fri"),
        "weekends" => return parse_day_key("sat-sun"),
        _ => {},
    }
    let unknown = || Error::Configuration(format!("unknown day in hours map: '{}'", key));
    match lower.split_once('-') {
        Some((start, end)) => {
            let start = Weekday::parse(start).ok_or_else(unknown)?;
            let end = Weekday::parse(end).ok_or_else(unknown)?;
            let span = start.days_until(end);
            Ok((0..=span).map(|offset| Weekday::from_index(start.index() + offset as usize)).collect())
        },
        None => Ok(vec![Weekday::parse(&lower).ok_or_else(unknown)?]),
    }
}

fn parse_window_value(value: &str) -> Result<Option<DayWindow>, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("closed") {
        return Ok(None);
    }
    DayWindow::parse(trimmed).map(Some)
}

impl TryFrom<BTreeMap<String, String>> for WeeklyHours {
    type Error = Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut hours = WeeklyHours::default();
        let (ranges, singles): (Vec<_>, Vec<_>) = map.iter().partition(|(key, _)| {
            let days = parse_day_key(key).map(|d| d.len()).unwrap_or(1);
            days > 1
        });
        for (key, value) in ranges.into_iter().chain(singles) {
            let window = parse_window_value(value)?;
            for day in parse_day_key(key)? {
                hours.days[day.index()] = window;
            }
        }
        Ok(hours)
    }
}

impl From<WeeklyHours> for BTreeMap<String, String> {
    fn from(hours: WeeklyHours) -> Self {
        Weekday::ALL
            .iter()
            .map(|day| {
                let value = match hours.window(*day) {
                    Some(w) => w.to_string(),
                    None => "closed".to_string(),
                };
                (day.short_name().to_ascii_lowercase(), value)
            })
            .collect()
    }
}

/// One entry of a tenant's service catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Canonical key, e.g. "massage"
    pub key: String,
    /// Alternative phrasings that should map to this key
    #[serde(default)]
    pub variants: Vec<String>,
    /// Display price, e.g. "$95"
    #[serde(default)]
    pub price: Option<String>,
}

impl ServiceEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            variants: Vec::new(),
            price: None,
        }
    }

    pub fn with_variants(mut self, variants: &[&str]) -> Self {
        self.variants = variants.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    /// The key followed by every variant.
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.variants.iter().map(String::as_str))
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

/// Per-tenant business configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: String,
    pub name: String,
    /// Business number that receives this tenant's SMS
    #[serde(default)]
    pub sms_number: String,
    /// IANA zone name
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub hours: WeeklyHours,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub after_hours_greeting: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl TenantConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sms_number: String::new(),
            timezone: default_timezone(),
            hours: WeeklyHours::default(),
            services: Vec::new(),
            greeting: None,
            after_hours_greeting: None,
            address: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_hours(mut self, hours: WeeklyHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn with_service(mut self, service: ServiceEntry) -> Self {
        self.services.push(service);
        self
    }

    pub fn service(&self, key: &str) -> Option<&ServiceEntry> {
        self.services.iter().find(|s| s.key.eq_ignore_ascii_case(key))
    }

    pub fn service_keys(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.key.as_str()).collect()
    }
}
