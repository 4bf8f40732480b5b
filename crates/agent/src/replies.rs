//! Reply templates
//!
//! Plain text only. Every user-facing sentence the receptionist sends is
//! built here so wording can be reviewed in one place.

use receptionist_core::{Booking, CivilDate, DayWindow, Proposal, Slots, TenantConfig, Weekday};

use crate::fsm::Outcome;

pub const GENERIC_FALLBACK: &str =
    "Sorry, something went wrong on our end. Please try again in a moment, or call us directly.";

pub fn for_outcome(outcome: &Outcome, tenant: &TenantConfig, slots: &Slots) -> String {
    match outcome {
        Outcome::AskName => "Happy to help you book! What name should I put the appointment under?".to_string(),
        Outcome::AskDatetime => ask_datetime(slots),
        Outcome::PastDatetime => "That time has already passed. What date and time would work instead?".to_string(),
        Outcome::ClosedDay { date, day } => closed_day(*date, *day),
        Outcome::OutsideWindow { date, window } => outside_window(*date, window),
        Outcome::AskService => ask_service(tenant),
        Outcome::Duplicate { existing } => format!(
            "You already have a {} request ({}). Would you like a different date and time?",
            existing.status,
            existing.describe()
        ),
        Outcome::Propose(proposal) => proposal_text(proposal),
    }
}

fn ask_datetime(slots: &Slots) -> String {
    match (&slots.name, &slots.service) {
        (Some(name), Some(service)) => format!("Thanks {}! What date and time would you like for your {}?", name, service),
        (Some(name), None) => format!("Thanks {}! What date and time work for you?", name),
        _ => "What date and time work for you?".to_string(),
    }
}

fn closed_day(date: CivilDate, day: Weekday) -> String {
    format!(
        "Sorry, we're closed on {}s ({}). What other day and time would work?",
        day.name(),
        date.describe()
    )
}

fn outside_window(date: CivilDate, window: &DayWindow) -> String {
    format!(
        "We're open {} on {}. What time in that window works for you?",
        window.describe(),
        date.describe()
    )
}

fn ask_service(tenant: &TenantConfig) -> String {
    let keys = tenant.service_keys();
    if keys.is_empty() {
        return "Which service would you like to book?".to_string();
    }
    format!("Which service would you like? We offer: {}.", keys.join(", "))
}

fn proposal_text(proposal: &Proposal) -> String {
    let action = if proposal.reschedule_of.is_some() { "Move your booking to" } else { "Book" };
    format!(
        "{} {} for {} on {} at {}? Reply CONFIRM to lock it in (ref {}).",
        action,
        proposal.service,
        proposal.name,
        proposal.date.describe(),
        proposal.time.describe(),
        proposal.id
    )
}

pub fn booked(booking: &Booking) -> String {
    format!(
        "You're all set, {}! We've requested your {}. We'll be in touch if anything changes.",
        booking.name,
        booking.describe()
    )
}

pub fn rescheduled(booking: &Booking) -> String {
    format!("Done, {}. Your booking is now {}.", booking.name, booking.describe())
}

pub fn already_booked(booking: &Booking) -> String {
    format!(
        "You already have a {} request for {}. No need to confirm again!",
        booking.status,
        booking.describe()
    )
}

pub fn nothing_to_confirm() -> String {
    "I don't have a pending request to confirm. Tell me what you'd like to book and when.".to_string()
}

pub fn session_cancelled() -> String {
    "No problem, I've cleared that request. Text us any time to book.".to_string()
}

pub fn booking_cancelled(booking: &Booking) -> String {
    format!("Your {} has been cancelled. Hope to see you another time!", booking.describe())
}

pub fn no_active_booking() -> String {
    "I couldn't find an upcoming booking for this number. Would you like to make one?".to_string()
}

pub fn reschedule_started(booking: &Booking) -> String {
    format!(
        "Sure, let's move your {}. What new date and time would you like?",
        booking.describe()
    )
}

pub fn opt_out(tenant: &TenantConfig) -> String {
    format!(
        "You're unsubscribed from {} messages and won't receive more texts. Reply START to resubscribe.",
        tenant.name
    )
}

pub fn opt_in(tenant: &TenantConfig) -> String {
    format!("You're subscribed to {} messages again. Reply STOP to opt out.", tenant.name)
}

pub fn help(tenant: &TenantConfig) -> String {
    format!(
        "{}: text us to book an appointment. Reply STOP to opt out. Msg & data rates may apply.",
        tenant.name
    )
}

pub fn hours(tenant: &TenantConfig) -> String {
    if tenant.hours.is_always_closed() {
        return format!("{} isn't taking appointments right now.", tenant.name);
    }
    format!("Our hours are {}.", tenant.hours.describe())
}

pub fn prices(tenant: &TenantConfig) -> String {
    let priced: Vec<String> = tenant
        .services
        .iter()
        .map(|service| match &service.price {
            Some(price) => format!("{} {}", service.key, price),
            None => service.key.clone(),
        })
        .collect();
    if priced.is_empty() {
        return "Prices depend on the service. What are you interested in?".to_string();
    }
    format!("Our services: {}. Want me to book one for you?", priced.join(", "))
}

pub fn location(tenant: &TenantConfig) -> String {
    match &tenant.address {
        Some(address) => format!("We're at {}.", address),
        None => format!("Reply with what you'd like to book and {} will send details.", tenant.name),
    }
}

pub fn greeting(tenant: &TenantConfig, after_hours: bool) -> String {
    if after_hours {
        if let Some(greeting) = &tenant.after_hours_greeting {
            return greeting.clone();
        }
    }
    tenant.greeting.clone().unwrap_or_else(|| {
        format!(
            "Hi! Thanks for texting {}. Would you like to book an appointment? Tell me the service, day and time.",
            tenant.name
        )
    })
}

/// One-line summary posted to staff
pub fn staff_summary(event: &str, booking: &Booking) -> String {
    format!(
        "[{}] {}: {} for {} ({}) ref {}",
        booking.tenant,
        event,
        booking.describe(),
        booking.name,
        booking.phone,
        booking.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::{CivilDateTime, ServiceEntry};

    fn tenant() -> TenantConfig {
        TenantConfig::new("spa", "Serenity Spa")
            .with_service(ServiceEntry::new("massage").with_price("$120"))
            .with_service(ServiceEntry::new("facial"))
    }

    #[test]
    fn test_proposal_mentions_confirm_and_ref() {
        let slots = Slots {
            service: Some("massage".to_string()),
            date: Some("2026-10-16".parse().unwrap()),
            time: Some("15:00".parse().unwrap()),
            name: Some("Alex".to_string()),
        };
        let created: CivilDateTime = "2026-10-15 14:00".parse().unwrap();
        let proposal = Proposal::from_slots(&slots, created, None).unwrap();
        let text = for_outcome(&Outcome::Propose(proposal.clone()), &tenant(), &slots);
        assert!(text.contains("CONFIRM"));
        assert!(text.contains(&proposal.id));
        assert!(text.contains("Fri, Oct 16 at 3:00 PM"));
    }

    #[test]
    fn test_window_reply_cites_hours() {
        let window = DayWindow::parse("09:00-18:00").unwrap();
        let outcome = Outcome::OutsideWindow {
            date: "2026-10-15".parse().unwrap(),
            window,
        };
        let text = for_outcome(&outcome, &tenant(), &Slots::default());
        assert!(text.contains("9:00 AM-6:00 PM"));
    }

    #[test]
    fn test_catalog_replies() {
        let tenant = tenant();
        assert!(for_outcome(&Outcome::AskService, &tenant, &Slots::default()).contains("massage, facial"));
        assert!(prices(&tenant).contains("massage $120"));
        assert!(location(&tenant).contains("Serenity Spa"));
    }

    #[test]
    fn test_after_hours_greeting() {
        let mut tenant = tenant();
        assert!(greeting(&tenant, true).contains("Serenity Spa"));
        tenant.after_hours_greeting = Some("We're closed, leave a message!".to_string());
        tenant.greeting = Some("Hello!".to_string());
        assert_eq!(greeting(&tenant, true), "We're closed, leave a message!");
        assert_eq!(greeting(&tenant, false), "Hello!");
    }
}
