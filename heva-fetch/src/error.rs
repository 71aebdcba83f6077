//! API error types.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Every way a call through [`ApiClient`](crate::ApiClient) can fail.
///
/// Errors carry only owned strings so they can be cloned and compared;
/// the retry wrapper hands back the final error exactly as produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response within the configured window.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the envelope, or `HTTP <status>`.
        message: String,
        /// Optional details from the envelope.
        details: Option<String>,
    },

    /// Transport failure: DNS, refused connection, reset, offline.
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl ApiError {
    /// Builds an [`ApiError::Api`] from a failed response body.
    ///
    /// The message is the body's `error`, else its `message`, else
    /// `HTTP <status>`. Only string fields count as messages; the rest of
    /// the body may have any shape. Structured `details` are kept as
    /// compact JSON.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let body = serde_json::from_str::<Value>(body).ok();
        let field = |key: &str| body.as_ref().and_then(|b| b.get(key));
        let text = |key: &str| field(key).and_then(Value::as_str);

        let message = text("error")
            .or_else(|| text("message"))
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string);
        let details = match field("details") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        ApiError::Api {
            status: status.as_u16(),
            message,
            details,
        }
    }

    /// Classifies a transport-level error from reqwest.
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else if err.is_connect() || err.is_request() || err.is_body() {
            ApiError::Network(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Api {
                status: status.as_u16(),
                message: format!("HTTP {}", status.as_u16()),
                details: None,
            }
        } else {
            ApiError::Unknown(err.to_string())
        }
    }

    /// HTTP status for [`ApiError::Api`].
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if trying again could plausibly succeed.
    ///
    /// Timeouts and network failures always qualify. API errors qualify for
    /// 5xx, 408 (request timeout) and 429 (rate limited).
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Network(_) => true,
            ApiError::Api { status, .. } => *status >= 500 || matches!(*status, 408 | 429),
            ApiError::Unknown(_) => false,
        }
    }

    /// Short kind name for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Timeout(_) => "timeout",
            ApiError::Api { .. } => "api_error",
            ApiError::Network(_) => "network_error",
            ApiError::Unknown(_) => "unknown",
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Unknown(format!("Invalid JSON: {err}"))
    }
}
