//! Bookings and delivery reports arriving outside the SMS conversation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use receptionist_core::{Booking, BookingStatus, CivilDateTime, TenantConfig, TurnStatus};
use receptionist_persistence::MessageRow;

use crate::AgentError;

/// Accepts a JSON string, number or null
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Booking posted by a web form or scheduling tool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingIntake {
    #[serde(default, alias = "spa_id", deserialize_with = "lenient_string")]
    pub tenant: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub service: String,
    /// Tenant-local "YYYY-MM-DD HH:MM" or "YYYY-MM-DDTHH:MM[:SS]"
    #[serde(default, alias = "start_time_local", deserialize_with = "lenient_string")]
    pub start_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timezone: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub channel: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub staff: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub revenue: String,
    #[serde(default, alias = "external_apt_id", deserialize_with = "lenient_string")]
    pub external_id: String,
    #[serde(default, alias = "utm_campaign", deserialize_with = "lenient_string")]
    pub campaign: String,
}

impl BookingIntake {
    /// Validate and build the first booking version.
    ///
    /// `tenant` fills the timezone when the payload has none.
    pub fn into_booking(self, tenant: Option<&TenantConfig>, now: DateTime<Utc>) -> Result<Booking, AgentError> {
        let tenant_id = self.tenant.trim();
        if tenant_id.is_empty() {
            return Err(AgentError::InvalidInput("tenant required".to_string()));
        }
        let start: CivilDateTime = self
            .start_time
            .parse()
            .map_err(|_| AgentError::InvalidInput(format!("invalid start time '{}'", self.start_time)))?;
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| AgentError::InvalidInput(format!("unknown status '{}'", self.status)))?;
        let timezone = match (self.timezone.trim(), tenant) {
            ("", Some(tenant)) => tenant.timezone.clone(),
            (tz, _) => tz.to_string(),
        };
        let channel = if self.channel.trim().is_empty() { "web".to_string() } else { self.channel };

        Ok(Booking {
            id: Booking::generate_id(now),
            tenant: tenant_id.to_string(),
            phone: receptionist_core::normalize_phone(&self.phone),
            name: self.name.trim().to_string(),
            email: self.email,
            service: self.service,
            date: start.date,
            time: start.time,
            timezone,
            channel,
            source: self.source,
            notes: self.notes,
            staff: self.staff,
            status,
            price: self.price,
            revenue: self.revenue,
            external_id: self.external_id,
            campaign: self.campaign,
            created_at: now,
        })
    }
}

/// Transport delivery callback for an outbound message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryReport {
    #[serde(default, rename = "MessageSid")]
    pub message_sid: String,
    #[serde(default, rename = "MessageStatus")]
    pub status: String,
    /// Customer number
    #[serde(default, rename = "To")]
    pub to: String,
    /// Business number
    #[serde(default, rename = "From")]
    pub from: String,
    #[serde(default, rename = "ErrorCode")]
    pub error_code: String,
}

impl DeliveryReport {
    pub fn to_row(&self, tenant: &str, at: DateTime<Utc>) -> MessageRow {
        let status = match self.status.trim() {
            "" => "unknown".to_string(),
            s => s.to_ascii_lowercase(),
        };
        let mut row = MessageRow::outbound(
            tenant,
            &receptionist_core::normalize_phone(&self.to),
            &receptionist_core::normalize_phone(&self.from),
            "",
            at,
        )
        .with_status(TurnStatus::Delivery(status))
        .with_error(self.error_code.clone());
        if !self.message_sid.is_empty() {
            row = row.with_notes(format!("sid={}", self.message_sid));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_intake_with_legacy_field_names() {
        let intake: BookingIntake = serde_json::from_value(serde_json::json!({
            "spa_id": "spa",
            "name": "Jordan",
            "phone": "(555) 000-1111",
            "service": "facial",
            "start_time_local": "2026-10-20T11:00:00",
            "status": "requested",
            "price": 95,
            "utm_campaign": "fall",
        }))
        .unwrap();

        let tenant = TenantConfig::new("spa", "Serenity Spa").with_timezone("America/Chicago");
        let booking = intake.into_booking(Some(&tenant), now()).unwrap();
        assert!(booking.id.starts_with("bk_"));
        assert_eq!(booking.phone, "+15550001111");
        assert_eq!(booking.start().to_string(), "2026-10-20 11:00");
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.price, "95");
        assert_eq!(booking.campaign, "fall");
        assert_eq!(booking.timezone, "America/Chicago");
        assert_eq!(booking.channel, "web");
    }

    #[test]
    fn test_intake_requires_tenant_and_start() {
        let missing_tenant = BookingIntake {
            start_time: "2026-10-20 11:00".to_string(),
            ..Default::default()
        };
        assert!(matches!(missing_tenant.into_booking(None, now()), Err(AgentError::InvalidInput(_))));

        let bad_start = BookingIntake {
            tenant: "spa".to_string(),
            start_time: "next week".to_string(),
            ..Default::default()
        };
        assert!(bad_start.into_booking(None, now()).is_err());
    }

    #[test]
    fn test_delivery_row() {
        let report = DeliveryReport {
            message_sid: "SM123".to_string(),
            status: "Delivered".to_string(),
            to: "+15550001111".to_string(),
            from: "+15559990000".to_string(),
            error_code: String::new(),
        };
        let row = report.to_row("spa", now());
        assert_eq!(row.status, TurnStatus::Delivery("delivered".to_string()));
        assert_eq!(row.customer(), "+15550001111");
        assert_eq!(row.notes, "sid=SM123");
        assert!(!row.status.is_dialogue());
    }
}
