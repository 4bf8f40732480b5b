//! Persisted bookings

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::civil::{CivilDate, CivilDateTime, ClockTime};

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Older rows were written with "requested"; they read back as pending.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "requested" | "" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Pending and confirmed bookings are active.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking version as stored in the bookings log. The latest row for an
/// id is the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub tenant: String,
    pub phone: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub service: String,
    pub date: CivilDate,
    pub time: ClockTime,
    pub timezone: String,
    pub channel: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub staff: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub revenue: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub campaign: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// `bk_<epoch millis>_<random>`
    pub fn generate_id(now: DateTime<Utc>) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
        format!("bk_{}_{}", now.timestamp_millis(), suffix)
    }

    pub fn start(&self) -> CivilDateTime {
        CivilDateTime::new(self.date, self.time)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// "massage on Fri, Oct 16 at 3:00 PM"
    pub fn describe(&self) -> String {
        format!("{} on {} at {}", self.service, self.date.describe(), self.time.describe())
    }
}
