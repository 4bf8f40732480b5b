//! End-to-end booking conversations against the in-memory row store

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use receptionist_agent::{BookingIntake, DeliveryReport, InboundSms, Receptionist, TurnKind, TurnReply};
use receptionist_config::{ConversationConfig, TenantDirectory, TenantRegistry};
use receptionist_core::{
    BookingStatus, DayWindow, FixedClock, ServiceEntry, TenantConfig, TurnStatus, Weekday, WeeklyHours,
};
use receptionist_persistence::{MessageRow, PersistenceLayer, RowRange, Tab};

const BUSINESS: &str = "+15559990000";
const CUSTOMER: &str = "+15550001111";

fn tenant() -> TenantConfig {
    let window = DayWindow::parse("09:00-18:00").unwrap();
    let hours = [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday, Weekday::Friday]
        .into_iter()
        .fold(WeeklyHours::new(), |h, d| h.with_day(d, window));
    let mut tenant = TenantConfig::new("spa", "Serenity Spa")
        .with_timezone("America/New_York")
        .with_hours(hours)
        .with_service(ServiceEntry::new("massage").with_price("$120"))
        .with_service(ServiceEntry::new("facial").with_price("$95"));
    tenant.sms_number = BUSINESS.to_string();
    tenant.after_hours_greeting = Some("We're closed right now, but text us what you'd like to book!".to_string());
    tenant
}

/// Thursday 2026-10-15 14:00 in New York
fn thursday_afternoon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap()
}

struct Harness {
    receptionist: Receptionist,
    clock: Arc<FixedClock>,
    layer: PersistenceLayer,
}

impl Harness {
    fn new(start: DateTime<Utc>) -> Self {
        let directory = TenantDirectory::new(vec![tenant()], Some("spa")).unwrap();
        let tenants = Arc::new(TenantRegistry::fixed(directory));
        let layer = PersistenceLayer::in_memory(5_000);
        let clock = Arc::new(FixedClock::new(start));
        let receptionist = Receptionist::new(tenants, layer.repository.clone(), &ConversationConfig::default())
            .with_clock(clock.clone());
        Self {
            receptionist,
            clock,
            layer,
        }
    }

    /// Send from the default customer, one minute after the previous turn
    async fn send(&self, body: &str) -> TurnReply {
        self.send_from(CUSTOMER, body).await
    }

    async fn send_from(&self, from: &str, body: &str) -> TurnReply {
        self.clock.advance(Duration::minutes(1));
        self.receptionist
            .handle(InboundSms {
                from: from.to_string(),
                to: BUSINESS.to_string(),
                body: body.to_string(),
            })
            .await
    }

    async fn active_bookings(&self, phone: &str) -> Vec<receptionist_core::Booking> {
        self.layer.repository.list_active_bookings("spa", phone).await.unwrap()
    }

    async fn message_rows(&self) -> Vec<MessageRow> {
        self.layer
            .store
            .read_rows("spa", Tab::Messages, RowRange::All)
            .await
            .unwrap()
            .iter()
            .filter_map(|columns| MessageRow::from_columns(columns))
            .collect()
    }
}

#[tokio::test]
async fn test_book_across_turns_then_confirm_once() {
    let h = Harness::new(thursday_afternoon());

    let reply = h.send("Hi, I'd like to book a massage tomorrow at 3pm").await;
    assert_eq!(reply.kind, TurnKind::Booking);
    assert!(reply.text.contains("name"), "{}", reply.text);

    let reply = h.send("Alex").await;
    assert!(reply.text.contains("CONFIRM"), "{}", reply.text);
    assert!(reply.text.contains("Fri, Oct 16 at 3:00 PM"), "{}", reply.text);
    assert!(reply.text.contains("Alex"));

    let reply = h.send("CONFIRM").await;
    assert_eq!(reply.kind, TurnKind::Booked);

    let bookings = h.active_bookings(CUSTOMER).await;
    assert_eq!(bookings.len(), 1);
    let booking = &bookings[0];
    assert_eq!(booking.name, "Alex");
    assert_eq!(booking.service, "massage");
    assert_eq!(booking.start().to_string(), "2026-10-16 15:00");
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.price, "$120");
    assert_eq!(booking.channel, "sms");

    // A second confirmation of the same proposal must not double-book
    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::Duplicate);
    assert_eq!(h.active_bookings(CUSTOMER).await.len(), 1);
}

#[tokio::test]
async fn test_confirm_without_proposal() {
    let h = Harness::new(thursday_afternoon());
    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::NothingToConfirm);
    assert!(h.active_bookings(CUSTOMER).await.is_empty());
}

#[tokio::test]
async fn test_outside_hours_then_new_time() {
    let h = Harness::new(thursday_afternoon());

    let reply = h.send("I'm Sam, book a facial for today at 11pm").await;
    assert!(reply.text.contains("9:00 AM-6:00 PM"), "{}", reply.text);

    // The rejected 11pm must not be re-read from history
    let reply = h.send("tomorrow at 10am then").await;
    assert!(reply.text.contains("CONFIRM"), "{}", reply.text);
    assert!(reply.text.contains("facial for Sam on Fri, Oct 16 at 10:00 AM"), "{}", reply.text);
}

#[tokio::test]
async fn test_tomorrow_uses_tenant_local_date() {
    // 02:30 UTC Friday is still Thursday evening in New York
    let h = Harness::new(Utc.with_ymd_and_hms(2026, 10, 16, 2, 30, 0).unwrap());

    let reply = h.send("Book a massage tomorrow at 10am, this is Jordan").await;
    assert!(reply.text.contains("Fri, Oct 16 at 10:00 AM"), "{}", reply.text);
}

#[tokio::test]
async fn test_hours_boundaries() {
    let h = Harness::new(thursday_afternoon());

    let reply = h.send_from("+15550002222", "Book a facial Friday at 6pm, my name is Riley").await;
    assert!(reply.text.contains("CONFIRM"), "closing time is bookable: {}", reply.text);

    let reply = h.send_from("+15550003333", "Book a facial Saturday at 10am, my name is Casey").await;
    assert!(reply.text.contains("closed on Saturdays"), "{}", reply.text);

    let reply = h.send_from("+15550004444", "Book a facial today at 9am, my name is Morgan").await;
    assert!(reply.text.contains("already passed"), "{}", reply.text);
}

#[tokio::test]
async fn test_later_mentions_fill_only_until_change() {
    let h = Harness::new(thursday_afternoon());

    let reply = h.send("book a massage tomorrow at 3pm, my name is Alex").await;
    assert!(reply.text.contains("3:00 PM"), "{}", reply.text);

    let reply = h.send("at 4pm").await;
    assert!(reply.text.contains("3:00 PM"), "{}", reply.text);

    let reply = h.send("actually 4pm instead").await;
    assert!(reply.text.contains("4:00 PM"), "{}", reply.text);
    assert!(reply.text.contains("massage for Alex"), "{}", reply.text);
}

#[tokio::test]
async fn test_opt_out_silences_until_start() {
    let h = Harness::new(thursday_afternoon());

    let reply = h.send("STOP").await;
    assert_eq!(reply.kind, TurnKind::Compliance(receptionist_text_processing::ComplianceKeyword::OptOut));
    assert!(reply.text.contains("unsubscribed"));

    let reply = h.send("book a massage tomorrow at 3pm").await;
    assert_eq!(reply.kind, TurnKind::Suppressed);
    assert!(reply.text.is_empty());

    let reply = h.send("start").await;
    assert!(reply.text.contains("subscribed"));

    let reply = h.send("hello").await;
    assert_eq!(reply.kind, TurnKind::Greeting);

    let rows = h.message_rows().await;
    assert!(rows.iter().any(|r| r.status == TurnStatus::Suppressed && r.body.contains("massage")));
    assert!(rows.iter().any(|r| r.status == TurnStatus::OptOut));
}

#[tokio::test]
async fn test_reschedule_then_cancel() {
    let h = Harness::new(thursday_afternoon());
    h.send("book a massage tomorrow at 3pm, my name is Alex").await;
    assert_eq!(h.send("CONFIRM").await.kind, TurnKind::Booked);
    let original = h.active_bookings(CUSTOMER).await.remove(0);

    let reply = h.send("Can I reschedule my appointment?").await;
    assert!(reply.text.contains("new date and time"), "{}", reply.text);

    let reply = h.send("Monday at 11am").await;
    assert!(reply.text.contains("Move your booking to"), "{}", reply.text);

    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::Rescheduled);

    let bookings = h.active_bookings(CUSTOMER).await;
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].id, original.id);
    assert_eq!(bookings[0].start().to_string(), "2026-10-19 11:00");

    let reply = h.send("Please cancel my appointment").await;
    assert_eq!(reply.kind, TurnKind::Cancelled);
    assert!(reply.text.contains("cancelled"));
    assert!(h.active_bookings(CUSTOMER).await.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_conversation_clears_request() {
    let h = Harness::new(thursday_afternoon());
    h.send("book a massage tomorrow").await;
    let reply = h.send("never mind").await;
    assert_eq!(reply.kind, TurnKind::Cancelled);

    // Nothing carried over into the next request
    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::NothingToConfirm);
}

#[tokio::test]
async fn test_cancelled_proposal_cannot_be_confirmed() {
    let h = Harness::new(thursday_afternoon());
    let reply = h.send("I'm Alex, book a massage tomorrow at 3pm").await;
    assert!(reply.text.contains("CONFIRM"), "{}", reply.text);

    let reply = h.send("cancel").await;
    assert_eq!(reply.kind, TurnKind::Cancelled);

    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::NothingToConfirm);
    assert!(h.active_bookings(CUSTOMER).await.is_empty());
}

#[tokio::test]
async fn test_replaced_proposal_cannot_be_confirmed() {
    let h = Harness::new(thursday_afternoon());
    let reply = h.send("I'm Alex, book a massage tomorrow at 3pm").await;
    assert!(reply.text.contains("Fri, Oct 16 at 3:00 PM"), "{}", reply.text);

    // Saturday is closed, so there is no live proposal any more
    let reply = h.send("make it saturday instead").await;
    assert_eq!(reply.kind, TurnKind::Booking);
    assert!(!reply.text.contains("CONFIRM"), "{}", reply.text);

    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::NothingToConfirm);
    assert!(h.active_bookings(CUSTOMER).await.is_empty());

    let reply = h.send("monday at 10am").await;
    assert!(reply.text.contains("CONFIRM"), "{}", reply.text);
    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::Booked);

    let bookings = h.active_bookings(CUSTOMER).await;
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].start().to_string(), "2026-10-19 10:00");
}

#[tokio::test]
async fn test_start_over_discards_earlier_answers() {
    let h = Harness::new(thursday_afternoon());
    h.send("I'm Alex, book a massage tomorrow at 3pm").await;

    let reply = h.send("start over").await;
    assert_eq!(reply.kind, TurnKind::Booking);
    assert!(reply.text.contains("name"), "{}", reply.text);
    assert!(!reply.text.contains("Alex"), "{}", reply.text);

    let reply = h.send("confirm").await;
    assert_eq!(reply.kind, TurnKind::NothingToConfirm);
    assert!(h.active_bookings(CUSTOMER).await.is_empty());
}

#[tokio::test]
async fn test_business_name_is_not_the_customer() {
    let h = Harness::new(thursday_afternoon());
    let reply = h.send("Can I book a massage at Serenity Spa tomorrow at 3pm").await;
    assert_eq!(reply.kind, TurnKind::Booking);
    assert!(!reply.text.contains("CONFIRM"), "{}", reply.text);
    assert!(reply.text.contains("name"), "{}", reply.text);
}

#[tokio::test]
async fn test_quick_answers_and_after_hours_greeting() {
    let h = Harness::new(thursday_afternoon());

    let reply = h.send("What are your hours?").await;
    assert_eq!(reply.kind, TurnKind::QuickAnswer);
    assert!(reply.text.contains("Mon"), "{}", reply.text);

    let reply = h.send("how much is a facial").await;
    // A service mention starts a booking instead of a price list
    assert_eq!(reply.kind, TurnKind::Booking);

    // Saturday noon in New York: closed all day
    let h = Harness::new(Utc.with_ymd_and_hms(2026, 10, 17, 16, 0, 0).unwrap());
    let reply = h.send("hello there").await;
    assert_eq!(reply.kind, TurnKind::Greeting);
    assert!(reply.text.starts_with("We're closed right now"), "{}", reply.text);
}

#[tokio::test]
async fn test_every_turn_is_logged() {
    let h = Harness::new(thursday_afternoon());
    h.send("What are your hours?").await;

    let rows = h.message_rows().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, TurnStatus::Received);
    assert_eq!(rows[0].customer(), CUSTOMER);
    assert_eq!(rows[1].status, TurnStatus::Replied);
    assert_eq!(rows[1].business(), BUSINESS);
}

#[tokio::test]
async fn test_intake_and_delivery_report() {
    let h = Harness::new(thursday_afternoon());

    let intake: BookingIntake = serde_json::from_value(serde_json::json!({
        "tenant": "spa",
        "name": "Jordan",
        "phone": "555-000-5555",
        "service": "facial",
        "start_time": "2026-10-20 11:00",
    }))
    .unwrap();
    let booking = h.receptionist.intake_booking(intake).await.unwrap();
    assert_eq!(booking.timezone, "America/New_York");
    assert_eq!(h.active_bookings("+15550005555").await.len(), 1);

    let unknown = BookingIntake {
        start_time: "2026-10-20 11:00".to_string(),
        ..Default::default()
    };
    assert!(h.receptionist.intake_booking(unknown).await.is_err());

    h.receptionist
        .record_delivery(&DeliveryReport {
            message_sid: "SM1".to_string(),
            status: "delivered".to_string(),
            to: CUSTOMER.to_string(),
            from: BUSINESS.to_string(),
            error_code: String::new(),
        })
        .await;
    let rows = h.message_rows().await;
    assert!(rows
        .iter()
        .any(|r| r.status == TurnStatus::Delivery("delivered".to_string()) && r.notes == "sid=SM1"));
}
