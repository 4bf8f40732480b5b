//! Collaborator traits
//!
//! External services the booking engine talks to through a seam, so they
//! can be swapped or faked in tests.

mod clock;
mod generator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use generator::TextGenerator;
