//! Response envelope returned by every HEVA+ endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Uniform wrapper around every backend response.
///
/// The client forwards the envelope as received. Fields the backend adds
/// beyond the documented five are kept in [`Envelope::extra`] so nothing
/// is dropped on the way through.
///
/// `message`, `error` and `details` are kept as raw JSON: backends send
/// validation maps in `details` as often as strings. A field sent as an
/// explicit `null` stays `Some(Value::Null)` and is written back as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T = Value> {
    /// Whether the backend considers the call successful.
    #[serde(default)]
    pub success: bool,
    /// Human-readable message.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    /// Payload.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error summary, set on failures.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Error details, set on failures.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Any other top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deserializes a field that is present in the body.
///
/// A `null` becomes `Some(..)` when `T` can represent it, so it survives a
/// round trip. Missing fields never reach this and fall back to `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::deserialize(Value::Null).ok());
    }
    T::deserialize(value).map(Some).map_err(serde::de::Error::custom)
}

impl<T> Envelope<T> {
    /// Creates a successful envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Self::default()
        }
    }

    /// Creates a failed envelope with an error summary.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(Value::String(error.into())),
            ..Self::default()
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(Value::String(message.into()));
        self
    }

    /// Sets the details. Accepts a string or any structured value.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<Value>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// `message`, if it is a string.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_ref().and_then(Value::as_str)
    }

    /// `error`, if it is a string.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_ref().and_then(Value::as_str)
    }

    /// `details` as display text.
    ///
    /// Strings are returned as-is, structured values as compact JSON.
    /// Absent and `null` details give `None`.
    pub fn details_text(&self) -> Option<String> {
        match self.details.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Returns the text a caller should show for a failure.
    ///
    /// Prefers `error`, then `message`. Non-string values are skipped.
    pub fn failure_message(&self) -> Option<&str> {
        self.error_text().or_else(|| self.message_text())
    }

    /// Consumes the envelope and returns the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: None,
            details: None,
            extra: Map::new(),
        }
    }
}
