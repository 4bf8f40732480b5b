//! Per-turn orchestration
//!
//! [`Receptionist::handle`] runs one inbound SMS to completion and always
//! produces a reply. Routing, in order:
//!
//! 1. Compliance keywords (STOP/START/HELP) answer immediately
//! 2. Opted-out senders get no reply
//! 3. Commands: confirm, cancel, reschedule
//! 4. Booking path when a session is open or the message asks to book
//! 5. Quick answers (hours, prices, location), else the greeting
//!
//! Audit writes are best effort. Read failures degrade to "nothing found".
//! A failed booking write turns into the generic fallback reply.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

use receptionist_config::{ConversationConfig, TenantRegistry};
use receptionist_core::{
    normalize_phone, Booking, BookingSession, BookingStatus, CivilDateTime, Clock, ConversationTurn, Proposal,
    SessionState, SystemClock, TenantConfig, TextGenerator, TurnStatus,
};
use receptionist_persistence::{BookingRepository, HistoryQuery, HistoryWindow, MessageRow};
use receptionist_text_processing::{
    detect_command, detect_compliance, detect_faq, find_service, has_booking_intent, mentions_datetime, Command,
    ComplianceKeyword, FaqTopic, SlotExtractor,
};

use crate::duplicate::{find_duplicate, Candidate};
use crate::fsm::{select_proposal, BookingFsm, Outcome, TurnContext};
use crate::hours::is_open_at;
use crate::intake::{BookingIntake, DeliveryReport};
use crate::notifier::{NoopNotifier, StaffNotifier};
use crate::replies;
use crate::session_cache::{SessionCache, SessionKey};
use crate::AgentError;

/// One inbound message as delivered by the SMS gateway
#[derive(Debug, Clone)]
pub struct InboundSms {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// How a turn was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Compliance(ComplianceKeyword),
    /// Opted-out sender, nothing sent
    Suppressed,
    QuickAnswer,
    Greeting,
    /// Booking conversation step (question, validation, proposal)
    Booking,
    Booked,
    Rescheduled,
    Duplicate,
    NothingToConfirm,
    Cancelled,
    Fallback,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::Compliance(ComplianceKeyword::OptOut) => "opt_out",
            TurnKind::Compliance(ComplianceKeyword::OptIn) => "opt_in",
            TurnKind::Compliance(ComplianceKeyword::Help) => "help",
            TurnKind::Suppressed => "suppressed",
            TurnKind::QuickAnswer => "quick_answer",
            TurnKind::Greeting => "greeting",
            TurnKind::Booking => "booking",
            TurnKind::Booked => "booked",
            TurnKind::Rescheduled => "rescheduled",
            TurnKind::Duplicate => "duplicate",
            TurnKind::NothingToConfirm => "nothing_to_confirm",
            TurnKind::Cancelled => "cancelled",
            TurnKind::Fallback => "fallback",
        }
    }

    /// Status tag for the messages-log rows of this turn
    fn row_status(&self) -> TurnStatus {
        match self {
            TurnKind::Compliance(keyword) => compliance_status(*keyword),
            TurnKind::Suppressed => TurnStatus::Suppressed,
            TurnKind::Fallback => TurnStatus::Error,
            _ => TurnStatus::Replied,
        }
    }
}

fn compliance_status(keyword: ComplianceKeyword) -> TurnStatus {
    match keyword {
        ComplianceKeyword::OptOut => TurnStatus::OptOut,
        ComplianceKeyword::OptIn => TurnStatus::OptIn,
        ComplianceKeyword::Help => TurnStatus::Help,
    }
}

/// Reply text for one turn. Empty text means send nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    pub kind: TurnKind,
}

impl TurnReply {
    pub fn new(text: impl Into<String>, kind: TurnKind) -> Self {
        Self { text: text.into(), kind }
    }

    pub fn silent() -> Self {
        Self::new("", TurnKind::Suppressed)
    }

    pub fn fallback() -> Self {
        Self::new(replies::GENERIC_FALLBACK, TurnKind::Fallback)
    }
}

/// Time windows derived from [`ConversationConfig`]
#[derive(Debug, Clone, Copy)]
pub struct ReceptionistSettings {
    pub history: HistoryWindow,
    pub session_ttl_minutes: i64,
    pub proposal_ttl_minutes: i64,
    pub cache_ttl: Duration,
}

impl From<&ConversationConfig> for ReceptionistSettings {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            history: HistoryWindow::new(
                config.history_max_turns,
                chrono::Duration::hours(config.history_max_age_hours),
            ),
            session_ttl_minutes: config.session_ttl_hours * 60,
            proposal_ttl_minutes: config.proposal_ttl_hours * 60,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }
}

/// Everything fixed at the start of a turn
struct Turn {
    tenant: Arc<TenantConfig>,
    customer: String,
    business: String,
    body: String,
    received_at: DateTime<Utc>,
    /// Tenant-local wall clock at `received_at`
    now: CivilDateTime,
    key: SessionKey,
}

pub struct Receptionist {
    tenants: Arc<TenantRegistry>,
    repository: Arc<dyn BookingRepository>,
    fsm: BookingFsm,
    cache: SessionCache,
    notifier: Arc<dyn StaffNotifier>,
    clock: Arc<dyn Clock>,
    polisher: Option<(Arc<dyn TextGenerator>, Duration)>,
    settings: ReceptionistSettings,
}

impl Receptionist {
    pub fn new(
        tenants: Arc<TenantRegistry>,
        repository: Arc<dyn BookingRepository>,
        config: &ConversationConfig,
    ) -> Self {
        let settings = ReceptionistSettings::from(config);
        Self {
            tenants,
            repository,
            fsm: BookingFsm::new(SlotExtractor::new()),
            cache: SessionCache::new(settings.cache_ttl),
            notifier: Arc::new(NoopNotifier),
            clock: Arc::new(SystemClock),
            polisher: None,
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_extractor(mut self, extractor: SlotExtractor) -> Self {
        self.fsm = BookingFsm::new(extractor);
        self
    }

    /// Rewrite greetings through the generator, falling back to the
    /// template when it fails or exceeds `deadline`.
    pub fn with_polisher(mut self, generator: Arc<dyn TextGenerator>, deadline: Duration) -> Self {
        self.polisher = Some((generator, deadline));
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn StaffNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn tenants(&self) -> &Arc<TenantRegistry> {
        &self.tenants
    }

    /// Run one turn. Never fails; collaborator errors become the generic
    /// fallback reply.
    pub async fn handle(&self, sms: InboundSms) -> TurnReply {
        let started = Instant::now();
        let turn = self.begin(sms);
        metrics::counter!("receptionist_inbound_total", "tenant" => turn.tenant.id.clone()).increment(1);

        let reply = match self.run(&turn).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(tenant = %turn.tenant.id, sender = %turn.customer, error = %e, "Turn failed");
                TurnReply::fallback()
            },
        };

        if !reply.text.is_empty() {
            let row = MessageRow::outbound(
                &turn.tenant.id,
                &turn.customer,
                &turn.business,
                &reply.text,
                self.clock.now(),
            )
            .with_status(reply.kind.row_status());
            self.log_row(&row).await;
        }

        metrics::counter!("receptionist_replies_total", "kind" => reply.kind.as_str()).increment(1);
        metrics::histogram!("receptionist_turn_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            tenant = %turn.tenant.id,
            sender = %turn.customer,
            kind = reply.kind.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Turn complete"
        );
        reply
    }

    fn begin(&self, sms: InboundSms) -> Turn {
        let received_at = self.clock.now();
        let tenant = self.tenants.resolve_by_number(&sms.to);
        let customer = normalize_phone(&sms.from);
        let business = match normalize_phone(&sms.to) {
            n if n.is_empty() => normalize_phone(&tenant.sms_number),
            n => n,
        };
        let now = CivilDateTime::from_instant(received_at, &tenant.timezone);
        let key = SessionKey::new(tenant.id.clone(), customer.clone());
        Turn {
            tenant,
            customer,
            business,
            body: sms.body.trim().to_string(),
            received_at,
            now,
            key,
        }
    }

    async fn run(&self, turn: &Turn) -> Result<TurnReply, AgentError> {
        tracing::debug!(tenant = %turn.tenant.id, sender = %turn.customer, body = %turn.body, "Inbound");

        if let Some(keyword) = detect_compliance(&turn.body) {
            return Ok(self.compliance(turn, keyword).await);
        }

        if self.is_opted_out(turn).await {
            self.log_inbound(turn, TurnStatus::Suppressed).await;
            tracing::info!(tenant = %turn.tenant.id, sender = %turn.customer, "Sender opted out, not replying");
            return Ok(TurnReply::silent());
        }
        self.log_inbound(turn, TurnStatus::Received).await;

        let _guard = self.cache.lock(&turn.key).await;
        let mut session = self.load_session(turn).await;
        if session.is_expired(&turn.now, self.settings.session_ttl_minutes) {
            tracing::info!(tenant = %turn.tenant.id, sender = %turn.customer, state = ?session.state, "Session expired");
            session.reset(turn.now, turn.received_at);
        }
        let before = session.clone();

        let reply = match detect_command(&turn.body) {
            Some(Command::Confirm { proposal_id }) => self.confirm(turn, &mut session, proposal_id.as_deref()).await,
            Some(Command::CancelRequest) if !session.state.is_idle() => {
                session.reset(turn.now, turn.received_at);
                Ok(TurnReply::new(replies::session_cancelled(), TurnKind::Cancelled))
            },
            Some(Command::CancelRequest) | Some(Command::CancelBooking) => self.cancel_booking(turn, &mut session).await,
            Some(Command::Reschedule) => Ok(self.reschedule(turn, &mut session).await),
            None if !session.state.is_idle() || self.wants_booking(turn) => Ok(self.advance(turn, &mut session).await),
            None => Ok(self.quick_answer(turn).await),
        };

        if session != before {
            self.save_session(turn, &session).await;
        }
        reply
    }

    fn wants_booking(&self, turn: &Turn) -> bool {
        has_booking_intent(&turn.body) || find_service(&turn.body, &turn.tenant.services).is_some()
    }

    // =========================================================================
    // Compliance
    // =========================================================================

    async fn compliance(&self, turn: &Turn, keyword: ComplianceKeyword) -> TurnReply {
        self.log_inbound(turn, compliance_status(keyword)).await;
        tracing::info!(tenant = %turn.tenant.id, sender = %turn.customer, keyword = ?keyword, "Compliance keyword");
        let text = match keyword {
            ComplianceKeyword::OptOut => replies::opt_out(&turn.tenant),
            ComplianceKeyword::OptIn => replies::opt_in(&turn.tenant),
            ComplianceKeyword::Help => replies::help(&turn.tenant),
        };
        TurnReply::new(text, TurnKind::Compliance(keyword))
    }

    async fn is_opted_out(&self, turn: &Turn) -> bool {
        match self.repository.is_opted_out(&turn.tenant.id, &turn.customer).await {
            Ok(opted_out) => opted_out,
            Err(e) => {
                tracing::warn!(tenant = %turn.tenant.id, error = %e, "Opt-out lookup failed, assuming subscribed");
                false
            },
        }
    }

    // =========================================================================
    // Booking conversation
    // =========================================================================

    async fn advance(&self, turn: &Turn, session: &mut BookingSession) -> TurnReply {
        let history = self.history(turn, session.scope_start).await;
        let active = self.active_bookings(turn).await;
        let ctx = TurnContext {
            tenant: &turn.tenant,
            now: turn.now,
            received_at: turn.received_at,
            text: &turn.body,
            history: &history,
            active_bookings: &active,
        };

        let outcome = self.fsm.advance(session, &ctx).await;
        match &outcome {
            Outcome::Propose(proposal) => self.save_proposal(turn, proposal).await,
            Outcome::Duplicate { existing } => {
                metrics::counter!("receptionist_duplicate_conflicts_total", "stage" => "proposal").increment(1);
                tracing::info!(tenant = %turn.tenant.id, booking = %existing.id, "Proposal matches an active booking");
            },
            _ => {},
        }

        TurnReply::new(replies::for_outcome(&outcome, &turn.tenant, &session.data), TurnKind::Booking)
    }

    async fn confirm(
        &self,
        turn: &Turn,
        session: &mut BookingSession,
        requested_id: Option<&str>,
    ) -> Result<TurnReply, AgentError> {
        let proposals = match self.repository.recent_proposals(&turn.tenant.id, &turn.customer).await {
            Ok(proposals) => proposals,
            Err(e) => {
                tracing::warn!(tenant = %turn.tenant.id, error = %e, "Proposal lookup failed");
                Vec::new()
            },
        };
        let ttl = self.settings.proposal_ttl_minutes;
        let Some(proposal) =
            select_proposal(&proposals, session.proposal_id.as_deref(), requested_id, &turn.now, ttl).cloned()
        else {
            // A repeated confirmation of something already booked gets told so
            if let Some(latest) = proposals.first().filter(|p| !p.is_expired(&turn.now, ttl)) {
                let active = self.active_bookings(turn).await;
                if let Some(existing) = find_duplicate(&active, &Candidate::from(latest), None) {
                    metrics::counter!("receptionist_duplicate_conflicts_total", "stage" => "confirm").increment(1);
                    return Ok(TurnReply::new(replies::already_booked(existing), TurnKind::Duplicate));
                }
            }
            if session.state == SessionState::AwaitingConfirm {
                session.reset(turn.now, turn.received_at);
            }
            return Ok(TurnReply::new(replies::nothing_to_confirm(), TurnKind::NothingToConfirm));
        };

        // Re-check at confirmation time; another turn may have booked this already
        let active = self.active_bookings(turn).await;
        if let Some(existing) = find_duplicate(&active, &Candidate::from(&proposal), proposal.reschedule_of.as_deref())
        {
            metrics::counter!("receptionist_duplicate_conflicts_total", "stage" => "confirm").increment(1);
            if !session.state.is_idle() {
                session.reset(turn.now, turn.received_at);
            }
            return Ok(TurnReply::new(replies::already_booked(existing), TurnKind::Duplicate));
        }

        let original = proposal
            .reschedule_of
            .as_deref()
            .and_then(|id| active.iter().find(|b| b.id == id));

        let (booking, kind, event) = match original {
            Some(original) if original.date == proposal.date && original.time == proposal.time => {
                if !session.state.is_idle() {
                    session.reset(turn.now, turn.received_at);
                }
                return Ok(TurnReply::new(replies::already_booked(original), TurnKind::Duplicate));
            },
            Some(original) => {
                let moved = Booking {
                    name: proposal.name.clone(),
                    service: proposal.service.clone(),
                    date: proposal.date,
                    time: proposal.time,
                    status: BookingStatus::Pending,
                    created_at: turn.received_at,
                    ..original.clone()
                };
                (moved, TurnKind::Rescheduled, "Rescheduled")
            },
            None => (self.new_booking(turn, &proposal), TurnKind::Booked, "New booking"),
        };

        self.repository.append_booking(&booking).await?;
        metrics::counter!("receptionist_bookings_total", "tenant" => turn.tenant.id.clone(), "kind" => kind.as_str())
            .increment(1);
        tracing::info!(
            tenant = %turn.tenant.id,
            booking = %booking.id,
            proposal = %proposal.id,
            kind = kind.as_str(),
            "Booking written"
        );

        session.reset(turn.now, turn.received_at);
        self.notify_staff(event, &booking);

        let text = match kind {
            TurnKind::Rescheduled => replies::rescheduled(&booking),
            _ => replies::booked(&booking),
        };
        Ok(TurnReply::new(text, kind))
    }

    fn new_booking(&self, turn: &Turn, proposal: &Proposal) -> Booking {
        let price = turn
            .tenant
            .service(&proposal.service)
            .and_then(|s| s.price.clone())
            .unwrap_or_default();
        Booking {
            id: Booking::generate_id(turn.received_at),
            tenant: turn.tenant.id.clone(),
            phone: turn.customer.clone(),
            name: proposal.name.clone(),
            email: String::new(),
            service: proposal.service.clone(),
            date: proposal.date,
            time: proposal.time,
            timezone: turn.tenant.timezone.clone(),
            channel: "sms".to_string(),
            source: "sms".to_string(),
            notes: format!("proposal {}", proposal.id),
            staff: String::new(),
            status: BookingStatus::Pending,
            price,
            revenue: String::new(),
            external_id: String::new(),
            campaign: String::new(),
            created_at: turn.received_at,
        }
    }

    async fn cancel_booking(&self, turn: &Turn, session: &mut BookingSession) -> Result<TurnReply, AgentError> {
        let active = self.active_bookings(turn).await;
        let Some(latest) = active.last() else {
            return Ok(TurnReply::new(replies::no_active_booking(), TurnKind::Cancelled));
        };

        let cancelled = Booking {
            status: BookingStatus::Cancelled,
            created_at: turn.received_at,
            ..latest.clone()
        };
        self.repository.append_booking(&cancelled).await?;
        tracing::info!(tenant = %turn.tenant.id, booking = %cancelled.id, "Booking cancelled");

        if !session.state.is_idle() {
            session.reset(turn.now, turn.received_at);
        }
        self.notify_staff("Cancelled", &cancelled);
        Ok(TurnReply::new(replies::booking_cancelled(&cancelled), TurnKind::Cancelled))
    }

    async fn reschedule(&self, turn: &Turn, session: &mut BookingSession) -> TurnReply {
        let active = self.active_bookings(turn).await;
        let Some(latest) = active.last() else {
            if !session.state.is_idle() {
                return self.advance(turn, session).await;
            }
            return TurnReply::new(replies::no_active_booking(), TurnKind::Booking);
        };

        session.reset(turn.now, turn.received_at);
        session.state = SessionState::AwaitingDatetime;
        session.data.name = Some(latest.name.clone());
        session.data.service = Some(latest.service.clone());
        session.rescheduling = Some(latest.id.clone());
        tracing::info!(tenant = %turn.tenant.id, booking = %latest.id, "Reschedule started");

        // "move my appointment to friday at 2" carries the new time already
        if mentions_datetime(&turn.body, turn.now.date) {
            return self.advance(turn, session).await;
        }
        TurnReply::new(replies::reschedule_started(latest), TurnKind::Booking)
    }

    // =========================================================================
    // Idle replies
    // =========================================================================

    async fn quick_answer(&self, turn: &Turn) -> TurnReply {
        if let Some(topic) = detect_faq(&turn.body) {
            let text = match topic {
                FaqTopic::Hours => replies::hours(&turn.tenant),
                FaqTopic::Price => replies::prices(&turn.tenant),
                FaqTopic::Location => replies::location(&turn.tenant),
            };
            return TurnReply::new(text, TurnKind::QuickAnswer);
        }

        let after_hours = !is_open_at(&turn.tenant.hours, &turn.now);
        let template = replies::greeting(&turn.tenant, after_hours);
        TurnReply::new(self.polish(turn, template).await, TurnKind::Greeting)
    }

    async fn polish(&self, turn: &Turn, template: String) -> String {
        let Some((generator, deadline)) = &self.polisher else {
            return template;
        };
        let instructions = format!(
            "You write SMS replies for {}. Rewrite the draft reply in a warm, concise tone. \
             Keep every fact, add nothing new, stay under 300 characters. Reply with the message text only.",
            turn.tenant.name
        );
        let prior: [ConversationTurn; 0] = [];
        match tokio::time::timeout(*deadline, generator.generate(&instructions, &prior, &template)).await {
            Ok(Ok(text)) => {
                let text = text.trim().trim_matches('"').trim();
                if text.is_empty() || text.chars().count() > 320 {
                    template
                } else {
                    text.to_string()
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(generator = generator.name(), error = %e, "Reply polishing failed");
                template
            },
            Err(_) => {
                tracing::warn!(generator = generator.name(), "Reply polishing timed out");
                template
            },
        }
    }

    // =========================================================================
    // Other channels
    // =========================================================================

    /// Record a transport delivery callback.
    pub async fn record_delivery(&self, report: &DeliveryReport) {
        let tenant = self.tenants.resolve_by_number(&report.from);
        let row = report.to_row(&tenant.id, self.clock.now());
        self.log_row(&row).await;
    }

    /// Append a booking that arrived from a form or scheduling tool.
    pub async fn intake_booking(&self, intake: BookingIntake) -> Result<Booking, AgentError> {
        let tenant = self.tenants.get(intake.tenant.trim());
        let booking = intake.into_booking(tenant.as_deref(), self.clock.now())?;
        self.repository.append_booking(&booking).await?;
        metrics::counter!("receptionist_bookings_total", "tenant" => booking.tenant.clone(), "kind" => "intake")
            .increment(1);
        tracing::info!(tenant = %booking.tenant, booking = %booking.id, channel = %booking.channel, "Booking intake");
        Ok(booking)
    }

    // =========================================================================
    // Store access
    // =========================================================================

    async fn load_session(&self, turn: &Turn) -> BookingSession {
        if let Some(session) = self.cache.get(&turn.key) {
            return session;
        }
        match self
            .repository
            .latest_session_snapshot(&turn.tenant.id, &turn.customer)
            .await
        {
            Ok(Some(session)) => session,
            Ok(None) => BookingSession::new(turn.now),
            Err(e) => {
                tracing::warn!(tenant = %turn.tenant.id, error = %e, "Session rehydration failed, starting fresh");
                BookingSession::new(turn.now)
            },
        }
    }

    async fn save_session(&self, turn: &Turn, session: &BookingSession) {
        self.cache.put(turn.key.clone(), session.clone());
        if let Err(e) = self
            .repository
            .save_session_snapshot(&turn.tenant.id, &turn.customer, &turn.business, session, turn.received_at)
            .await
        {
            metrics::counter!("receptionist_audit_write_failures_total", "row" => "session").increment(1);
            tracing::warn!(tenant = %turn.tenant.id, error = %e, "Session snapshot write failed");
        }
    }

    async fn save_proposal(&self, turn: &Turn, proposal: &Proposal) {
        if let Err(e) = self
            .repository
            .save_proposal(&turn.tenant.id, &turn.customer, &turn.business, proposal, turn.received_at)
            .await
        {
            metrics::counter!("receptionist_audit_write_failures_total", "row" => "proposal").increment(1);
            tracing::warn!(tenant = %turn.tenant.id, error = %e, "Proposal write failed");
        }
    }

    async fn history(&self, turn: &Turn, scope_start: Option<DateTime<Utc>>) -> Vec<ConversationTurn> {
        let query = HistoryQuery {
            tenant: &turn.tenant.id,
            customer: &turn.customer,
            business: &turn.business,
            before: turn.received_at,
            not_before: scope_start,
        };
        match self.repository.history(&query, &self.settings.history).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(tenant = %turn.tenant.id, error = %e, "History read failed");
                Vec::new()
            },
        }
    }

    async fn active_bookings(&self, turn: &Turn) -> Vec<Booking> {
        match self.repository.list_active_bookings(&turn.tenant.id, &turn.customer).await {
            Ok(bookings) => bookings,
            Err(e) => {
                tracing::warn!(tenant = %turn.tenant.id, error = %e, "Active booking scan failed");
                Vec::new()
            },
        }
    }

    async fn log_inbound(&self, turn: &Turn, status: TurnStatus) {
        let row = MessageRow::inbound(&turn.tenant.id, &turn.customer, &turn.business, &turn.body, turn.received_at)
            .with_status(status);
        self.log_row(&row).await;
    }

    async fn log_row(&self, row: &MessageRow) {
        if let Err(e) = self.repository.append_audit_row(row).await {
            metrics::counter!("receptionist_audit_write_failures_total", "row" => "message").increment(1);
            tracing::warn!(tenant = %row.tenant, status = %row.status, error = %e, "Audit row write failed");
        }
    }

    fn notify_staff(&self, event: &str, booking: &Booking) {
        let notifier = self.notifier.clone();
        let text = replies::staff_summary(event, booking);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&text).await {
                tracing::warn!(error = %e, "Staff notification failed");
            }
        });
    }
}
