//! Request descriptors and response bodies.

use std::collections::BTreeMap;

use heva_core::{Envelope, HttpMethod};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

// ============================================================================
// Request Descriptor
// ============================================================================

/// One call against the API, built per request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiRequest {
    /// Path relative to the base URL.
    pub endpoint: String,
    /// Request method.
    pub method: HttpMethod,
    /// JSON body.
    pub body: Option<Value>,
    /// Headers merged over the defaults.
    pub headers: BTreeMap<String, String>,
    /// Caller declares a non-idempotent request safe to repeat.
    pub retry_safe: bool,
}

impl ApiRequest {
    /// Creates a request with no body or extra headers.
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            ..Self::default()
        }
    }

    /// GET `endpoint`.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    /// POST `endpoint`.
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    /// PUT `endpoint`.
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, endpoint)
    }

    /// PATCH `endpoint`.
    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, endpoint)
    }

    /// DELETE `endpoint`.
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON body.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    /// Adds a header, overriding any default of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Marks the request as safe to retry even if its method is not idempotent.
    #[must_use]
    pub fn retry_safe(mut self, safe: bool) -> Self {
        self.retry_safe = safe;
        self
    }

    /// Returns true if the request may be sent more than once.
    pub fn is_retry_safe(&self) -> bool {
        self.method.is_idempotent() || self.retry_safe
    }
}

// ============================================================================
// Response Body
// ============================================================================

/// A successful response, decoded by content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T = Value> {
    /// JSON body parsed as an envelope.
    Json(Envelope<T>),
    /// Any other body, as text.
    Text(String),
}

impl<T> ApiResponse<T> {
    /// Returns the envelope, failing with [`ApiError::Unknown`] for text bodies.
    pub fn into_envelope(self) -> Result<Envelope<T>, ApiError> {
        match self {
            ApiResponse::Json(envelope) => Ok(envelope),
            ApiResponse::Text(text) => Err(ApiError::Unknown(format!(
                "Expected a JSON response, got text: {}",
                truncate(&text, 120)
            ))),
        }
    }

    /// Returns the envelope if the body was JSON.
    pub fn as_envelope(&self) -> Option<&Envelope<T>> {
        match self {
            ApiResponse::Json(envelope) => Some(envelope),
            ApiResponse::Text(_) => None,
        }
    }

    /// Returns the text if the body was not JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiResponse::Json(_) => None,
            ApiResponse::Text(text) => Some(text),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ============================================================================
// Multipart Upload
// ============================================================================

/// A file part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Form field name.
    pub field: String,
    /// File name sent to the server.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type; `application/octet-stream` when unset.
    pub mime: Option<String>,
}

/// Multipart form for [`ApiClient::upload`](crate::ApiClient::upload).
///
/// Kept as plain data so an upload can be rebuilt for each attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    files: Vec<UploadFile>,
    fields: Vec<(String, String)>,
}

impl UploadForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file part.
    #[must_use]
    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.files.push(UploadFile {
            field: field.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        });
        self
    }

    /// Adds a file part with an explicit MIME type.
    #[must_use]
    pub fn file_with_mime(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        mime: impl Into<String>,
    ) -> Self {
        self.files.push(UploadFile {
            field: field.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: Some(mime.into()),
        });
        self
    }

    /// Adds a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// File parts.
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    /// Text fields as `(name, value)`.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Returns true if the form has no parts.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.fields.is_empty()
    }

    pub(crate) fn to_multipart(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            let part = match &file.mime {
                Some(mime) => part
                    .mime_str(mime)
                    .map_err(|e| ApiError::Unknown(format!("Invalid MIME type {mime:?}: {e}")))?,
                None => part,
            };
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let req = ApiRequest::post("/scoring/submit/")
            .body(json!({"revenue": 120_000}))
            .header("X-Trace", "1");

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.endpoint, "/scoring/submit/");
        assert_eq!(req.headers.get("X-Trace").map(String::as_str), Some("1"));
        assert!(!req.is_retry_safe());
        assert!(req.retry_safe(true).is_retry_safe());
    }

    #[test]
    fn test_idempotent_methods_are_retry_safe() {
        assert!(ApiRequest::get("/a").is_retry_safe());
        assert!(ApiRequest::put("/a").is_retry_safe());
        assert!(ApiRequest::delete("/a").is_retry_safe());
        assert!(!ApiRequest::patch("/a").is_retry_safe());
    }

    #[test]
    fn test_json_body() {
        #[derive(Serialize)]
        struct Profile<'a> {
            sector: &'a str,
        }

        let req = ApiRequest::put("/profile/").json(&Profile { sector: "music" }).unwrap();
        assert_eq!(req.body, Some(json!({"sector": "music"})));
    }

    #[test]
    fn test_into_envelope_rejects_text() {
        let response: ApiResponse = ApiResponse::Text("plain".to_string());
        assert_eq!(response.as_text(), Some("plain"));
        assert!(matches!(response.into_envelope(), Err(ApiError::Unknown(_))));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_upload_form_parts() {
        let form = UploadForm::new()
            .text("kind", "bank_statement")
            .file_with_mime("document", "releve.pdf", b"%PDF-1.4".to_vec(), "application/pdf");

        assert!(!form.is_empty());
        assert_eq!(form.files()[0].file_name, "releve.pdf");
        assert!(form.to_multipart().is_ok());

        let bad = UploadForm::new().file_with_mime("f", "x", vec![1], "not a mime");
        assert!(bad.to_multipart().is_err());
    }
}
