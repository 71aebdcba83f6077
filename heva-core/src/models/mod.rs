//! Wire models for the HEVA+ API.
//!
//! - [`envelope`] - Response envelope
//! - [`method`] - HTTP methods
//! - [`waitlist`] - Waitlist micro-API models

mod envelope;
mod method;
mod waitlist;

pub use envelope::Envelope;
pub use method::HttpMethod;
pub use waitlist::{WaitlistCount, WaitlistEntry, WaitlistStatus};
