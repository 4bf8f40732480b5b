//! Booking receptionist agent
//!
//! Features:
//! - Slot-filling booking state machine with hours, past-time and duplicate checks
//! - Per-turn orchestration: compliance keywords, commands, quick answers
//! - Write-through session cache with per-sender turn serialization
//! - Proposal confirmation with a duplicate re-check at booking time
//! - Staff notifications over a chat webhook
//! - Direct booking intake and delivery-report logging

pub mod duplicate;
pub mod fsm;
pub mod hours;
pub mod intake;
pub mod notifier;
pub mod receptionist;
pub mod replies;
pub mod session_cache;

pub use duplicate::{canonical_name, canonical_service, find_duplicate, Candidate};
pub use fsm::{select_proposal, BookingFsm, Outcome, TurnContext};
pub use hours::{check_hours, is_open_at, HoursCheck};
pub use intake::{BookingIntake, DeliveryReport};
pub use notifier::{create_notifier, NoopNotifier, StaffNotifier, WebhookNotifier};
pub use receptionist::{InboundSms, Receptionist, ReceptionistSettings, TurnKind, TurnReply};
pub use session_cache::{SessionCache, SessionKey};

use receptionist_persistence::PersistenceError;
use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
