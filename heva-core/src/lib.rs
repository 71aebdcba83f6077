// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # HEVA Core
//!
//! Wire models and core types shared by the HEVA+ client crates.
//!
//! ## Key Types
//!
//! - [`Envelope`] - Uniform success/error/data wrapper every endpoint returns
//! - [`HttpMethod`] - Request methods supported by the API client
//! - [`WaitlistEntry`], [`WaitlistCount`], [`WaitlistStatus`] - Waitlist API models
//! - [`CoreError`] - Errors for model parsing and configuration

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{Envelope, HttpMethod, WaitlistCount, WaitlistEntry, WaitlistStatus};
