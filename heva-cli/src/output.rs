//! Output formatting for CLI.

use anyhow::Result;
use chrono::{DateTime, Utc};
use heva_core::Envelope;
use heva_fetch::ApiResponse;
use serde::Serialize;
use serde_json::Value;

use crate::{Cli, OutputFormat};

// ============================================================================
// Output Types
// ============================================================================

/// Token state. The token itself is never printed in full.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOutput {
    pub present: bool,
    pub valid: bool,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// One cache entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryOutput {
    pub key: String,
    pub stored_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

/// Connectivity check result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub online: bool,
    pub base_url: String,
    pub checked_at: DateTime<Utc>,
}

// ============================================================================
// Printing
// ============================================================================

/// Serializes `value` as JSON, pretty or compact.
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Prints `value` as JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T, cli: &Cli) -> Result<()> {
    println!("{}", to_json(value, cli.pretty)?);
    Ok(())
}

/// Prints an API response.
///
/// JSON mode prints the envelope exactly as received. Text mode prints the
/// message (if any) and then the data.
pub fn print_response(response: &ApiResponse<Value>, cli: &Cli) -> Result<()> {
    match response {
        ApiResponse::Json(envelope) => print_envelope(envelope, cli),
        ApiResponse::Text(text) => {
            println!("{text}");
            Ok(())
        }
    }
}

/// Prints a JSON envelope.
pub fn print_envelope(envelope: &Envelope<Value>, cli: &Cli) -> Result<()> {
    if cli.format == OutputFormat::Json {
        return print_json(envelope, cli);
    }

    if let Some(message) = envelope.message_text() {
        if !cli.quiet {
            println!("{message}");
        }
    }
    match &envelope.data {
        Some(Value::String(s)) => println!("{s}"),
        Some(data) => println!("{}", serde_json::to_string_pretty(data)?),
        None if envelope.message_text().is_none() => {
            println!("{}", serde_json::to_string_pretty(envelope)?);
        }
        None => {}
    }
    Ok(())
}

/// Shortens a token to its first and last characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Formats epoch milliseconds as UTC.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("a.b.c"), "*****");
        assert_eq!(
            mask_token("eyJhbGciOi.eyJzdWIiOi.c2lnbmF0dXJl"),
            "eyJhbG...dXJl"
        );
    }

    #[test]
    fn test_to_json_compact_and_pretty() {
        let value = json!({"a": 1});
        assert_eq!(to_json(&value, false).unwrap(), r#"{"a":1}"#);
        assert_eq!(to_json(&value, true).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_cache_entry_output_is_camel_case() {
        let out = CacheEntryOutput {
            key: "score".to_string(),
            stored_at: from_millis(0),
            expires_at: from_millis(1000),
            expired: true,
        };
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["key"], "score");
        assert_eq!(value["expired"], true);
        assert_eq!(value["expiresAt"], "1970-01-01T00:00:01Z");
    }
}
