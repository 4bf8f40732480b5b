//! Booking session, slots and proposals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::civil::{CivilDate, CivilDateTime, ClockTime};

/// Booking session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingName,
    AwaitingDatetime,
    AwaitingService,
    AwaitingConfirm,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingName => "awaiting_name",
            SessionState::AwaitingDatetime => "awaiting_datetime",
            SessionState::AwaitingService => "awaiting_service",
            SessionState::AwaitingConfirm => "awaiting_confirm",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four booking fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotField {
    Service,
    Date,
    Time,
    Name,
}

impl SlotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotField::Service => "service",
            SlotField::Date => "date",
            SlotField::Time => "time",
            SlotField::Name => "name",
        }
    }
}

/// Partial slot set. `None` always means "not stated yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<CivilDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Slots {
    pub fn is_empty(&self) -> bool {
        self.service.is_none() && self.date.is_none() && self.time.is_none() && self.name.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn missing(&self) -> Vec<SlotField> {
        let mut missing = Vec::new();
        if self.service.is_none() {
            missing.push(SlotField::Service);
        }
        if self.date.is_none() {
            missing.push(SlotField::Date);
        }
        if self.time.is_none() {
            missing.push(SlotField::Time);
        }
        if self.name.is_none() {
            missing.push(SlotField::Name);
        }
        missing
    }

    /// Fill empty fields from `other`; set fields are never overwritten.
    /// Returns true if anything was filled.
    pub fn fill_from(&mut self, other: &Slots) -> bool {
        let mut changed = false;
        if self.service.is_none() && other.service.is_some() {
            self.service = other.service.clone();
            changed = true;
        }
        if self.date.is_none() && other.date.is_some() {
            self.date = other.date;
            changed = true;
        }
        if self.time.is_none() && other.time.is_some() {
            self.time = other.time;
            changed = true;
        }
        if self.name.is_none() && other.name.is_some() {
            self.name = other.name.clone();
            changed = true;
        }
        changed
    }

    /// Fields present in `newer` take precedence, fields only in `self` stay.
    pub fn overlaid_with(&self, newer: &Slots) -> Slots {
        Slots {
            service: newer.service.clone().or_else(|| self.service.clone()),
            date: newer.date.or(self.date),
            time: newer.time.or(self.time),
            name: newer.name.clone().or_else(|| self.name.clone()),
        }
    }

    pub fn clear_datetime(&mut self) {
        self.date = None;
        self.time = None;
    }

    pub fn datetime(&self) -> Option<CivilDateTime> {
        Some(CivilDateTime::new(self.date?, self.time?))
    }
}

/// Per-(tenant, sender) conversation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSession {
    pub state: SessionState,
    #[serde(default)]
    pub data: Slots,
    /// Tenant-local time of the last transition
    pub last_updated: CivilDateTime,
    /// Turns received before this instant are not used for extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_start: Option<DateTime<Utc>>,
    /// Booking id being moved by a reschedule flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescheduling: Option<String>,
    /// The one proposal a confirmation may book; cleared whenever the
    /// proposed slots stop being current
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<String>,
}

impl BookingSession {
    pub fn new(now: CivilDateTime) -> Self {
        Self {
            state: SessionState::Idle,
            data: Slots::default(),
            last_updated: now,
            scope_start: None,
            rescheduling: None,
            proposal_id: None,
        }
    }

    /// Inactivity check against the tenant-local civil clock.
    pub fn is_expired(&self, now: &CivilDateTime, ttl_minutes: i64) -> bool {
        !self.state.is_idle() && now.minutes_since(&self.last_updated) >= ttl_minutes
    }

    /// Back to idle with no data. Older turns stop counting as context.
    pub fn reset(&mut self, now: CivilDateTime, received_at: DateTime<Utc>) {
        self.state = SessionState::Idle;
        self.data = Slots::default();
        self.last_updated = now;
        self.scope_start = Some(received_at);
        self.rescheduling = None;
        self.proposal_id = None;
    }

    pub fn touch(&mut self, now: CivilDateTime) {
        self.last_updated = now;
    }
}

/// Immutable snapshot of a complete slot set awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub name: String,
    pub service: String,
    pub date: CivilDate,
    pub time: ClockTime,
    pub created_at: CivilDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reschedule_of: Option<String>,
}

impl Proposal {
    /// Returns `None` unless every slot is filled.
    pub fn from_slots(slots: &Slots, created_at: CivilDateTime, reschedule_of: Option<String>) -> Option<Self> {
        let name = slots.name.clone()?;
        let service = slots.service.clone()?;
        let date = slots.date?;
        let time = slots.time?;
        let id = Self::derive_id(&name, &service, &date, &time);
        Some(Self {
            id,
            name,
            service,
            date,
            time,
            created_at,
            reschedule_of,
        })
    }

    /// Stable identifier: FNV-1a over the slot values.
    pub fn derive_id(name: &str, service: &str, date: &CivilDate, time: &ClockTime) -> String {
        let key = format!("{}|{}|{}|{}", name.to_lowercase(), service.to_lowercase(), date, time);
        let mut hash: u32 = 0x811c_9dc5;
        for byte in key.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        format!("P-{:06X}", hash & 0x00ff_ffff)
    }

    pub fn is_expired(&self, now: &CivilDateTime, ttl_minutes: i64) -> bool {
        now.minutes_since(&self.created_at) >= ttl_minutes
    }

    pub fn datetime(&self) -> CivilDateTime {
        CivilDateTime::new(self.date, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> CivilDateTime {
        "2026-10-15 10:00".parse().unwrap()
    }

    #[test]
    fn test_fill_only_merge() {
        let mut slots = Slots {
            service: Some("massage".to_string()),
            ..Default::default()
        };
        let later = Slots {
            service: Some("facial".to_string()),
            name: Some("Alex".to_string()),
            ..Default::default()
        };
        assert!(slots.fill_from(&later));
        assert_eq!(slots.service.as_deref(), Some("massage"));
        assert_eq!(slots.name.as_deref(), Some("Alex"));
        assert!(!slots.fill_from(&Slots::default()));
    }

    #[test]
    fn test_overlay_prefers_newer() {
        let older = Slots {
            service: Some("massage".to_string()),
            time: "15:00".parse().ok(),
            ..Default::default()
        };
        let newer = Slots {
            time: "16:00".parse().ok(),
            ..Default::default()
        };
        let merged = older.overlaid_with(&newer);
        assert_eq!(merged.service.as_deref(), Some("massage"));
        assert_eq!(merged.time.unwrap().to_string(), "16:00");
    }

    #[test]
    fn test_session_expiry_uses_civil_clock() {
        let mut session = BookingSession::new(now());
        session.state = SessionState::AwaitingName;
        let later: CivilDateTime = "2026-10-16 09:59".parse().unwrap();
        assert!(!session.is_expired(&later, 24 * 60));
        let later: CivilDateTime = "2026-10-16 10:00".parse().unwrap();
        assert!(session.is_expired(&later, 24 * 60));

        session.state = SessionState::Idle;
        assert!(!session.is_expired(&later, 24 * 60));
    }

    #[test]
    fn test_reset_drops_live_proposal() {
        let mut session = BookingSession::new(now());
        session.state = SessionState::AwaitingConfirm;
        session.proposal_id = Some("P-1A2B3C".to_string());
        session.rescheduling = Some("bk_1".to_string());

        let received_at = Utc::now();
        session.reset(now(), received_at);
        assert_eq!(session.state, SessionState::Idle);
        assert_eq!(session.proposal_id, None);
        assert_eq!(session.rescheduling, None);
        assert_eq!(session.scope_start, Some(received_at));
    }

    #[test]
    fn test_proposal_requires_complete_slots() {
        let mut slots = Slots {
            name: Some("Alex".to_string()),
            service: Some("massage".to_string()),
            date: "2026-10-16".parse().ok(),
            ..Default::default()
        };
        assert!(Proposal::from_slots(&slots, now(), None).is_none());
        slots.time = "15:00".parse().ok();
        let proposal = Proposal::from_slots(&slots, now(), None).unwrap();
        assert!(proposal.id.starts_with("P-"));
        assert_eq!(proposal.id.len(), 8);

        let again = Proposal::from_slots(&slots, now(), None).unwrap();
        assert_eq!(proposal.id, again.id);
    }

    #[test]
    fn test_session_snapshot_json() {
        let mut session = BookingSession::new(now());
        session.state = SessionState::AwaitingConfirm;
        session.data.name = Some("Alex".to_string());
        session.proposal_id = Some("P-1A2B3C".to_string());
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"state\":\"awaiting_confirm\""));
        assert!(json.contains("\"proposal_id\":\"P-1A2B3C\""));
        let back: BookingSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
