//! Waitlist micro-API models.
//!
//! The waitlist service predates the envelope contract and its responses
//! are not consistent, so each model knows how to pick itself out of the
//! shapes seen in practice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Join
// ============================================================================

/// A waitlist registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Registered email.
    pub email: String,
    /// Display name, if given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Position in the queue, if the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    /// Registration time, if the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl WaitlistEntry {
    /// Builds an entry from a join response, falling back to the submitted values.
    pub fn from_response(value: &Value, email: &str, name: Option<&str>) -> Self {
        let body = payload(value);
        let field = |keys: &[&str]| keys.iter().find_map(|k| body.get(*k));

        Self {
            email: field(&["email"])
                .and_then(Value::as_str)
                .unwrap_or(email)
                .to_string(),
            name: field(&["name"])
                .and_then(Value::as_str)
                .or(name)
                .map(str::to_string),
            position: field(&["position", "rank"]).and_then(Value::as_u64),
            joined_at: field(&["joined_at", "joinedAt", "created_at", "createdAt"])
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

// ============================================================================
// Count
// ============================================================================

/// Number of people on the waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistCount {
    /// Total registrations.
    pub count: u64,
}

impl WaitlistCount {
    /// Extracts the count from `{count}`, `{total}`, `{data: {count}}` or `{data: n}`.
    pub fn from_response(value: &Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return Some(Self { count: n });
        }
        let body = payload(value);
        if let Some(n) = body.as_u64() {
            return Some(Self { count: n });
        }
        ["count", "total"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_u64))
            .map(|count| Self { count })
    }
}

// ============================================================================
// Check
// ============================================================================

/// Whether an email is already on the waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistStatus {
    /// Checked email.
    pub email: String,
    /// True if registered.
    pub on_waitlist: bool,
}

impl WaitlistStatus {
    /// Extracts the membership flag from the shapes the service returns.
    pub fn from_response(value: &Value, email: &str) -> Option<Self> {
        let body = payload(value);
        let flag = if let Some(b) = body.as_bool() {
            Some(b)
        } else {
            ["exists", "on_waitlist", "onWaitlist", "joined", "registered"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_bool))
        };

        flag.map(|on_waitlist| Self {
            email: email.to_string(),
            on_waitlist,
        })
    }
}

/// Returns the `data` member if present, otherwise the value itself.
fn payload(value: &Value) -> &Value {
    match value.get("data") {
        Some(data) if !data.is_null() => data,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_shapes() {
        assert_eq!(WaitlistCount::from_response(&json!({"count": 42})).unwrap().count, 42);
        assert_eq!(WaitlistCount::from_response(&json!({"total": 7})).unwrap().count, 7);
        assert_eq!(
            WaitlistCount::from_response(&json!({"success": true, "data": {"count": 3}}))
                .unwrap()
                .count,
            3
        );
        assert_eq!(WaitlistCount::from_response(&json!({"data": 11})).unwrap().count, 11);
        assert_eq!(WaitlistCount::from_response(&json!(5)).unwrap().count, 5);
        assert!(WaitlistCount::from_response(&json!({"count": "many"})).is_none());
    }

    #[test]
    fn test_status_shapes() {
        let email = "ada@example.com";
        assert!(WaitlistStatus::from_response(&json!({"exists": true}), email).unwrap().on_waitlist);
        assert!(
            !WaitlistStatus::from_response(&json!({"data": {"onWaitlist": false}}), email)
                .unwrap()
                .on_waitlist
        );
        assert!(WaitlistStatus::from_response(&json!({"data": true}), email).unwrap().on_waitlist);
        assert!(WaitlistStatus::from_response(&json!({"ok": 1}), email).is_none());
    }

    #[test]
    fn test_entry_falls_back_to_submitted_values() {
        let entry = WaitlistEntry::from_response(&json!({"success": true}), "a@b.co", Some("Ada"));
        assert_eq!(entry.email, "a@b.co");
        assert_eq!(entry.name.as_deref(), Some("Ada"));
        assert!(entry.position.is_none());

        let entry = WaitlistEntry::from_response(
            &json!({"data": {"email": "a@b.co", "position": 12, "joinedAt": "2024-05-01T10:00:00Z"}}),
            "a@b.co",
            None,
        );
        assert_eq!(entry.position, Some(12));
        assert!(entry.joined_at.is_some());
    }
}
