//! Row encodings for the messages and bookings tabs
//!
//! Column order is part of the storage contract; operators read these tabs
//! directly. Decoding is tolerant: missing trailing columns read as empty,
//! and rows that cannot be interpreted are skipped by callers.

use chrono::{DateTime, SecondsFormat, Utc};

use receptionist_core::{Booking, BookingStatus, CivilDateTime, TurnStatus};

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn column(columns: &[String], index: usize) -> &str {
    columns.get(index).map(String::as_str).unwrap_or("")
}

// =============================================================================
// Messages tab
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
    /// Session/proposal snapshots and other bookkeeping rows
    Internal,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
            Direction::Internal => "internal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbound" | "in" => Some(Direction::Inbound),
            "outbound" | "out" => Some(Direction::Outbound),
            "internal" => Some(Direction::Internal),
            _ => None,
        }
    }
}

/// One row of the messages log:
/// `timestamp, tenant, direction, to, from, channel, status, body, error, notes`
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub timestamp: DateTime<Utc>,
    pub tenant: String,
    pub direction: Direction,
    pub to: String,
    pub from: String,
    pub channel: String,
    pub status: TurnStatus,
    pub body: String,
    pub error: String,
    pub notes: String,
}

impl MessageRow {
    pub const COLUMNS: [&'static str; 10] = [
        "timestamp",
        "tenant",
        "direction",
        "to",
        "from",
        "channel",
        "status",
        "body",
        "error",
        "notes",
    ];

    fn base(
        tenant: &str,
        direction: Direction,
        to: &str,
        from: &str,
        status: TurnStatus,
        body: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: at,
            tenant: tenant.to_string(),
            direction,
            to: to.to_string(),
            from: from.to_string(),
            channel: "sms".to_string(),
            status,
            body: body.to_string(),
            error: String::new(),
            notes: String::new(),
        }
    }

    /// Customer to business
    pub fn inbound(tenant: &str, customer: &str, business: &str, body: &str, at: DateTime<Utc>) -> Self {
        Self::base(tenant, Direction::Inbound, business, customer, TurnStatus::Received, body, at)
    }

    /// Business to customer
    pub fn outbound(tenant: &str, customer: &str, business: &str, body: &str, at: DateTime<Utc>) -> Self {
        Self::base(tenant, Direction::Outbound, customer, business, TurnStatus::Replied, body, at)
    }

    /// Bookkeeping row about a customer (snapshots, delivery callbacks)
    pub fn internal(tenant: &str, customer: &str, business: &str, status: TurnStatus, at: DateTime<Utc>) -> Self {
        Self::base(tenant, Direction::Internal, business, customer, status, "", at)
    }

    pub fn with_status(mut self, status: TurnStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// The customer side of the exchange
    pub fn customer(&self) -> &str {
        match self.direction {
            Direction::Outbound => &self.to,
            Direction::Inbound | Direction::Internal => &self.from,
        }
    }

    /// The business side of the exchange
    pub fn business(&self) -> &str {
        match self.direction {
            Direction::Outbound => &self.from,
            Direction::Inbound | Direction::Internal => &self.to,
        }
    }

    pub fn to_columns(&self) -> Vec<String> {
        vec![
            format_timestamp(self.timestamp),
            self.tenant.clone(),
            self.direction.as_str().to_string(),
            self.to.clone(),
            self.from.clone(),
            self.channel.clone(),
            self.status.as_str(),
            self.body.clone(),
            self.error.clone(),
            self.notes.clone(),
        ]
    }

    /// `None` when the timestamp, direction or status cannot be read.
    pub fn from_columns(columns: &[String]) -> Option<Self> {
        Some(Self {
            timestamp: parse_timestamp(column(columns, 0))?,
            tenant: column(columns, 1).to_string(),
            direction: Direction::parse(column(columns, 2))?,
            to: column(columns, 3).to_string(),
            from: column(columns, 4).to_string(),
            channel: column(columns, 5).to_string(),
            status: TurnStatus::parse(column(columns, 6).trim())?,
            body: column(columns, 7).to_string(),
            error: column(columns, 8).to_string(),
            notes: column(columns, 9).to_string(),
        })
    }
}

// =============================================================================
// Bookings tab
// =============================================================================

/// Column names of the bookings log, in order
pub const BOOKING_COLUMNS: [&str; 18] = [
    "timestamp",
    "booking_id",
    "tenant",
    "channel",
    "name",
    "phone",
    "email",
    "service",
    "start",
    "timezone",
    "source",
    "notes",
    "staff",
    "status",
    "price",
    "revenue",
    "external_id",
    "campaign",
];

pub fn booking_to_columns(booking: &Booking) -> Vec<String> {
    vec![
        format_timestamp(booking.created_at),
        booking.id.clone(),
        booking.tenant.clone(),
        booking.channel.clone(),
        booking.name.clone(),
        booking.phone.clone(),
        booking.email.clone(),
        booking.service.clone(),
        booking.start().to_string(),
        booking.timezone.clone(),
        booking.source.clone(),
        booking.notes.clone(),
        booking.staff.clone(),
        booking.status.as_str().to_string(),
        booking.price.clone(),
        booking.revenue.clone(),
        booking.external_id.clone(),
        booking.campaign.clone(),
    ]
}

/// `None` when the id, start time or status cannot be read.
pub fn booking_from_columns(columns: &[String]) -> Option<Booking> {
    let id = column(columns, 1).trim();
    if id.is_empty() {
        return None;
    }
    let start: CivilDateTime = column(columns, 8).parse().ok()?;
    let created_at = parse_timestamp(column(columns, 0)).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Some(Booking {
        id: id.to_string(),
        tenant: column(columns, 2).to_string(),
        channel: column(columns, 3).to_string(),
        name: column(columns, 4).to_string(),
        phone: column(columns, 5).to_string(),
        email: column(columns, 6).to_string(),
        service: column(columns, 7).to_string(),
        date: start.date,
        time: start.time,
        timezone: column(columns, 9).to_string(),
        source: column(columns, 10).to_string(),
        notes: column(columns, 11).to_string(),
        staff: column(columns, 12).to_string(),
        status: BookingStatus::parse(column(columns, 13))?,
        price: column(columns, 14).to_string(),
        revenue: column(columns, 15).to_string(),
        external_id: column(columns, 16).to_string(),
        campaign: column(columns, 17).to_string(),
        created_at,
    })
}
