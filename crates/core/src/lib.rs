//! Core types for the SMS receptionist
//!
//! This crate provides the foundational types shared by every other crate:
//! - Civil calendar arithmetic (dates, clock times, weekdays) that never
//!   touches instant/timezone math except at the single `now` boundary
//! - Tenant configuration (weekly hours, service catalog)
//! - Booking session, slots, proposals and bookings
//! - Conversation turns as read back from the messages log
//! - Collaborator traits (text generation, clock)
//! - Error types

pub mod booking;
pub mod civil;
pub mod conversation;
pub mod error;
pub mod phone;
pub mod session;
pub mod tenant;
pub mod traits;

pub use booking::{Booking, BookingStatus};
pub use civil::{CivilDate, CivilDateTime, ClockTime, Weekday};
pub use conversation::{ConversationTurn, TurnRole, TurnStatus};
pub use error::{Error, Result};
pub use phone::{normalize_phone, phones_match};
pub use session::{BookingSession, Proposal, SessionState, SlotField, Slots};
pub use tenant::{DayWindow, ServiceEntry, TenantConfig, WeeklyHours};
pub use traits::{Clock, FixedClock, SystemClock, TextGenerator};
