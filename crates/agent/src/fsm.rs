//! Booking session state machine
//!
//! One call to [`BookingFsm::advance`] per inbound turn on the booking path.
//! The machine mutates the session in place and reports what the sender
//! should be told next; persistence and reply wording live elsewhere.
//!
//! Evaluation order, first failing check wins:
//!
//! ```text
//! name? -> date+time? -> not in the past? -> within hours? -> service?
//!       -> not a duplicate? -> propose
//! ```

use chrono::{DateTime, Duration, Utc};

use receptionist_core::{
    Booking, BookingSession, CivilDate, CivilDateTime, ConversationTurn, DayWindow, Proposal, SessionState, SlotField,
    TenantConfig, Weekday,
};
use receptionist_text_processing::{ExtractionContext, SlotExtractor};

use crate::duplicate::{find_duplicate, Candidate};
use crate::hours::{check_hours, HoursCheck};

/// Everything the machine reads for one turn
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub tenant: &'a TenantConfig,
    /// Tenant-local wall clock, computed once per turn
    pub now: CivilDateTime,
    pub received_at: DateTime<Utc>,
    pub text: &'a str,
    /// Prior turns in scope, oldest first, excluding `text`
    pub history: &'a [ConversationTurn],
    /// The sender's active bookings
    pub active_bookings: &'a [Booking],
}

/// What to tell the sender after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    AskName,
    AskDatetime,
    PastDatetime,
    ClosedDay { date: CivilDate, day: Weekday },
    OutsideWindow { date: CivilDate, window: DayWindow },
    AskService,
    Duplicate { existing: Booking },
    Propose(Proposal),
}

impl Outcome {
    /// Short label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::AskName => "ask_name",
            Outcome::AskDatetime => "ask_datetime",
            Outcome::PastDatetime => "past_datetime",
            Outcome::ClosedDay { .. } => "closed_day",
            Outcome::OutsideWindow { .. } => "outside_window",
            Outcome::AskService => "ask_service",
            Outcome::Duplicate { .. } => "duplicate",
            Outcome::Propose(_) => "propose",
        }
    }
}

pub struct BookingFsm {
    extractor: SlotExtractor,
}

impl BookingFsm {
    pub fn new(extractor: SlotExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &SlotExtractor {
        &self.extractor
    }

    /// Extract, merge, validate, and move the session to its next state.
    pub async fn advance(&self, session: &mut BookingSession, ctx: &TurnContext<'_>) -> Outcome {
        let from = session.state;
        self.merge_turn(session, ctx).await;

        let outcome = evaluate(session, ctx);
        session.proposal_id = match &outcome {
            Outcome::Propose(proposal) => Some(proposal.id.clone()),
            _ => None,
        };
        session.state = match &outcome {
            Outcome::AskName => SessionState::AwaitingName,
            Outcome::AskService => SessionState::AwaitingService,
            Outcome::Propose(_) => SessionState::AwaitingConfirm,
            _ => SessionState::AwaitingDatetime,
        };
        session.touch(ctx.now);

        tracing::debug!(
            tenant = %ctx.tenant.id,
            from = from.as_str(),
            to = session.state.as_str(),
            outcome = outcome.as_str(),
            "Session transition"
        );
        outcome
    }

    /// Deterministic extraction first, the generator only for what is still
    /// missing. Both merges are fill-only except after a scope signal.
    async fn merge_turn(&self, session: &mut BookingSession, ctx: &TurnContext<'_>) {
        let mut extraction_ctx =
            ExtractionContext::new(ctx.now.date, &ctx.tenant.services).with_business_name(&ctx.tenant.name);
        if session.state == SessionState::AwaitingName {
            extraction_ctx = extraction_ctx.expecting(SlotField::Name);
        }

        let extraction = self.extractor.extract(ctx.text, ctx.history, &extraction_ctx);
        let history: &[ConversationTurn] = if extraction.starts_over() {
            // Only what this message states survives
            session.reset(ctx.now, ctx.received_at);
            session.data = extraction.slots;
            &[]
        } else if extraction.change_requested() {
            // Stated fields replace earlier answers; unstated ones stay
            session.data = session.data.overlaid_with(&extraction.slots);
            session.scope_start = Some(ctx.received_at);
            &[]
        } else {
            session.data.fill_from(&extraction.slots);
            ctx.history
        };

        if !session.data.is_complete() && self.extractor.has_fallback() {
            if let Some(slots) = self.extractor.fallback(ctx.text, history, &extraction_ctx).await {
                if session.data.fill_from(&slots) {
                    metrics::counter!("receptionist_extraction_fallback_fills_total").increment(1);
                }
            }
        }
    }
}

/// Apply the ordered checks. Rejected date/time values are cleared and the
/// history scope is moved past this turn so they are not re-read.
fn evaluate(session: &mut BookingSession, ctx: &TurnContext<'_>) -> Outcome {
    let data = &session.data;
    if data.name.is_none() {
        return Outcome::AskName;
    }
    let (Some(date), Some(time)) = (data.date, data.time) else {
        return Outcome::AskDatetime;
    };

    let requested = CivilDateTime::new(date, time);
    if requested < ctx.now {
        reject_datetime(session, ctx);
        return Outcome::PastDatetime;
    }

    match check_hours(&ctx.tenant.hours, date, time) {
        HoursCheck::Open => {},
        HoursCheck::ClosedDay { day } => {
            reject_datetime(session, ctx);
            return Outcome::ClosedDay { date, day };
        },
        HoursCheck::OutsideWindow { window, .. } => {
            reject_datetime(session, ctx);
            return Outcome::OutsideWindow { date, window };
        },
    }

    let Some(service) = session.data.service.as_deref() else {
        return Outcome::AskService;
    };
    let name = session.data.name.as_deref().unwrap_or_default();

    let candidate = Candidate {
        name,
        service,
        date,
        time,
    };
    if let Some(existing) = find_duplicate(ctx.active_bookings, &candidate, session.rescheduling.as_deref()) {
        let existing = existing.clone();
        reject_datetime(session, ctx);
        return Outcome::Duplicate { existing };
    }

    match Proposal::from_slots(&session.data, ctx.now, session.rescheduling.clone()) {
        Some(proposal) => Outcome::Propose(proposal),
        None => Outcome::AskDatetime,
    }
}

fn reject_datetime(session: &mut BookingSession, ctx: &TurnContext<'_>) {
    session.data.clear_datetime();
    session.scope_start = Some(ctx.received_at + Duration::milliseconds(1));
}

/// Pick the proposal a confirmation refers to.
///
/// Only the session's live proposal can be booked, and only while it is
/// unexpired. A replaced or abandoned proposal never is, even when named
/// explicitly; a stale requested id falls back to the live one.
/// `proposals` is newest first.
pub fn select_proposal<'p>(
    proposals: &'p [Proposal],
    live_id: Option<&str>,
    requested_id: Option<&str>,
    now: &CivilDateTime,
    ttl_minutes: i64,
) -> Option<&'p Proposal> {
    let live_id = live_id?;
    if let Some(requested) = requested_id.filter(|id| !id.eq_ignore_ascii_case(live_id)) {
        tracing::debug!(requested, live = live_id, "Confirmation names a proposal that is no longer live");
    }
    proposals
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(live_id))
        .filter(|p| !p.is_expired(now, ttl_minutes))
}
