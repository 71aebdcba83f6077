//! CLI command implementations.

pub mod cache;
pub mod request;
pub mod status;
pub mod token;
pub mod upload;
pub mod waitlist;
