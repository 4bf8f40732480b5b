//! Text processing for inbound booking messages
//!
//! - **Temporal normalization**: "tomorrow at 3pm" to absolute tenant-local values
//! - **Intent detection**: compliance keywords, confirm/cancel/reschedule, FAQ topics
//! - **Slot extraction**: service, date, time and name from a message and its history,
//!   with an optional language-model fallback
//!
//! # Example
//!
//! ```
//! use receptionist_core::{CivilDate, ServiceEntry};
//! use receptionist_text_processing::{ExtractionContext, SlotExtractor};
//!
//! let services = vec![ServiceEntry::new("massage")];
//! let ctx = ExtractionContext::new(CivilDate::new(2026, 10, 15).unwrap(), &services);
//! let extraction = SlotExtractor::new().extract("massage tomorrow at 3pm", &[], &ctx);
//!
//! assert_eq!(extraction.slots.service.as_deref(), Some("massage"));
//! assert_eq!(extraction.slots.date.unwrap().to_string(), "2026-10-16");
//! ```

pub mod intent;
pub mod slot_extraction;
pub mod temporal;

pub use intent::{
    detect_command, detect_compliance, detect_faq, detect_scope_signal, has_booking_intent, has_change_signal,
    Command, ComplianceKeyword, FaqTopic, ScopeSignal,
};
pub use slot_extraction::{extract_message, find_service, Extraction, ExtractionContext, SlotExtractor};
pub use temporal::{mentions_datetime, normalize_date, normalize_time};
