// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # HEVA Fetch
//!
//! The resilient HTTP layer of the HEVA+ client.
//!
//! - [`client::ApiClient`] - Requests against the configured base URL with
//!   timeout, bearer token injection and typed errors
//! - [`retry`] - Exponential backoff around any async operation
//! - [`network::NetworkStatus`] - Online/offline observable and probe monitor
//! - [`waitlist::WaitlistClient`] - Client for the waitlist micro-API
//!
//! ## Example
//!
//! ```ignore
//! use heva_fetch::{ApiClient, ApiRequest, ClientConfig, RetryStrategy};
//! use heva_store::TokenManager;
//!
//! let client = ApiClient::new(ClientConfig::from_env()?, TokenManager::in_memory())?;
//!
//! // Single shot
//! let envelope = client.get::<serde_json::Value>("/scoring/score/").await?.into_envelope()?;
//!
//! // GET is idempotent, so this retries transient failures
//! let response = client
//!     .request_with_retry::<serde_json::Value>(&ApiRequest::get("/scoring/score/"), &RetryStrategy::default())
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod request;
pub mod retry;
pub mod waitlist;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use network::{spawn_monitor, AnyProbe, ConnectivityProbe, HttpProbe, NetworkStatus, Subscription};
pub use request::{ApiRequest, ApiResponse, UploadFile, UploadForm};
pub use retry::{with_retry, RetryStrategy};
pub use waitlist::WaitlistClient;
