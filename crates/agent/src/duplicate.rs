//! Near-duplicate detection against a sender's active bookings
//!
//! Guards against gateway retries and double-texted confirmations. Two
//! requests are the same booking when, after normalization, the name,
//! service, date and quarter-hour all agree.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use receptionist_core::{Booking, CivilDate, ClockTime, Proposal};

/// Short forms mapped to the canonical full name
static NAME_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("alex", "alexander"),
        ("al", "alexander"),
        ("andy", "andrew"),
        ("drew", "andrew"),
        ("ben", "benjamin"),
        ("beth", "elizabeth"),
        ("liz", "elizabeth"),
        ("lizzy", "elizabeth"),
        ("bill", "william"),
        ("will", "william"),
        ("bob", "robert"),
        ("rob", "robert"),
        ("chris", "christopher"),
        ("dan", "daniel"),
        ("danny", "daniel"),
        ("dave", "david"),
        ("jen", "jennifer"),
        ("jenny", "jennifer"),
        ("jim", "james"),
        ("jimmy", "james"),
        ("joe", "joseph"),
        ("kate", "katherine"),
        ("katie", "katherine"),
        ("kathy", "katherine"),
        ("matt", "matthew"),
        ("mike", "michael"),
        ("nick", "nicholas"),
        ("pat", "patricia"),
        ("sam", "samantha"),
        ("steve", "steven"),
        ("tom", "thomas"),
        ("tony", "anthony"),
    ]
    .into_iter()
    .collect()
});

/// Lowercase, collapse whitespace, map a short first name to its full form.
pub fn canonical_name(name: &str) -> String {
    let lower = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut parts = lower.splitn(2, ' ');
    let first = parts.next().unwrap_or_default();
    let first = NAME_ALIASES.get(first).copied().unwrap_or(first);
    match parts.next() {
        Some(rest) => format!("{} {}", first, rest),
        None => first.to_string(),
    }
}

/// Lowercase and drop a trivial plural ending ("facials" -> "facial").
pub fn canonical_service(service: &str) -> String {
    let lower = service.trim().to_lowercase();
    if lower.len() > 3 && !lower.ends_with("ss") {
        if let Some(stem) = lower.strip_suffix("es").filter(|s| s.ends_with("ss") || s.ends_with("sh") || s.ends_with("ch")) {
            return stem.to_string();
        }
        if let Some(stem) = lower.strip_suffix('s') {
            return stem.to_string();
        }
    }
    lower
}

/// The booking being checked
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub service: &'a str,
    pub date: CivilDate,
    pub time: ClockTime,
}

impl<'a> From<&'a Proposal> for Candidate<'a> {
    fn from(proposal: &'a Proposal) -> Self {
        Self {
            name: &proposal.name,
            service: &proposal.service,
            date: proposal.date,
            time: proposal.time,
        }
    }
}

/// First active booking that matches `candidate`. `ignore_id` excludes the
/// booking being rescheduled.
pub fn find_duplicate<'b>(
    active: &'b [Booking],
    candidate: &Candidate<'_>,
    ignore_id: Option<&str>,
) -> Option<&'b Booking> {
    let name = canonical_name(candidate.name);
    let service = canonical_service(candidate.service);
    let quarter = candidate.time.rounded_quarter_minutes();

    active.iter().find(|booking| {
        booking.is_active()
            && ignore_id != Some(booking.id.as_str())
            && booking.date == candidate.date
            && booking.time.rounded_quarter_minutes() == quarter
            && canonical_service(&booking.service) == service
            && canonical_name(&booking.name) == name
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use receptionist_core::BookingStatus;

    fn booking(id: &str, name: &str, service: &str, time: &str) -> Booking {
        Booking {
            id: id.to_string(),
            tenant: "spa".to_string(),
            phone: "+15550001111".to_string(),
            name: name.to_string(),
            email: String::new(),
            service: service.to_string(),
            date: "2026-10-16".parse().unwrap(),
            time: time.parse().unwrap(),
            timezone: "America/New_York".to_string(),
            channel: "sms".to_string(),
            source: "sms".to_string(),
            notes: String::new(),
            staff: String::new(),
            status: BookingStatus::Pending,
            price: String::new(),
            revenue: String::new(),
            external_id: String::new(),
            campaign: String::new(),
            created_at: Utc::now(),
        }
    }

    fn candidate<'a>(name: &'a str, service: &'a str, time: &str) -> Candidate<'a> {
        Candidate {
            name,
            service,
            date: "2026-10-16".parse().unwrap(),
            time: time.parse().unwrap(),
        }
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_name("Alex"), "alexander");
        assert_eq!(canonical_name("  ALEXANDER "), "alexander");
        assert_eq!(canonical_name("Alex  Kim"), "alexander kim");
        assert_eq!(canonical_name("Priya"), "priya");
    }

    #[test]
    fn test_canonical_services() {
        assert_eq!(canonical_service("Facials"), "facial");
        assert_eq!(canonical_service("massage"), "massage");
        assert_eq!(canonical_service("massages"), "massage");
        assert_eq!(canonical_service("brushes"), "brush");
        assert_eq!(canonical_service("Class"), "class");
    }

    #[test]
    fn test_alias_plural_and_rounding_match() {
        let active = vec![booking("bk_1", "Alexander", "massage", "15:00")];
        let hit = find_duplicate(&active, &candidate("alex", "Massages", "15:07"), None);
        assert_eq!(hit.map(|b| b.id.as_str()), Some("bk_1"));
    }

    #[test]
    fn test_differences_are_not_duplicates() {
        let active = vec![booking("bk_1", "Alex", "massage", "15:00")];
        assert!(find_duplicate(&active, &candidate("Alex", "massage", "15:08"), None).is_none());
        assert!(find_duplicate(&active, &candidate("Jordan", "massage", "15:00"), None).is_none());
        assert!(find_duplicate(&active, &candidate("Alex", "facial", "15:00"), None).is_none());

        let mut other_day = candidate("Alex", "massage", "15:00");
        other_day.date = "2026-10-17".parse().unwrap();
        assert!(find_duplicate(&active, &other_day, None).is_none());
    }

    #[test]
    fn test_ignored_and_cancelled_bookings() {
        let mut cancelled = booking("bk_2", "Alex", "massage", "15:00");
        cancelled.status = BookingStatus::Cancelled;
        let active = vec![booking("bk_1", "Alex", "massage", "15:00"), cancelled];
        assert!(find_duplicate(&active, &candidate("Alex", "massage", "15:00"), Some("bk_1")).is_none());
    }
}
