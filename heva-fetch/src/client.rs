//! HTTP client for the HEVA+ API.
//!
//! [`ApiClient`] adds to a plain reqwest client:
//! - a base URL every endpoint is relative to
//! - `Authorization: Token <token>` from the [`TokenManager`]
//! - a timeout covering the whole exchange, body included
//! - content-type driven decoding and typed [`ApiError`]s
//!
//! It never retries on its own. Wrap calls with
//! [`ApiClient::request_with_retry`] or [`crate::retry`] for that.

use std::fmt;

use heva_core::{Envelope, HttpMethod};
use heva_store::TokenManager;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse, UploadForm};
use crate::retry::RetryStrategy;

/// A response read to completion within the timeout.
struct RawResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

/// Client for the HEVA+ REST API.
///
/// Cheap to clone; clones share the connection pool and token store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    config: ClientConfig,
    tokens: TokenManager,
}

impl ApiClient {
    /// Creates a client from `config`, reading tokens from `tokens`.
    pub fn new(config: ClientConfig, tokens: TokenManager) -> Result<Self, ApiError> {
        let inner = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(inner, config, tokens))
    }

    /// Creates a client around an existing reqwest client.
    pub fn with_http_client(inner: Client, config: ClientConfig, tokens: TokenManager) -> Self {
        Self {
            inner,
            config,
            tokens,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The token manager in use.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Sends `req` once.
    ///
    /// 2xx responses come back as [`ApiResponse::Json`] when the content type
    /// is JSON and [`ApiResponse::Text`] otherwise. Anything else is an
    /// [`ApiError::Api`] carrying the status code.
    #[instrument(skip(self, req), fields(method = %req.method, endpoint = %req.endpoint))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        req: &ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.config.endpoint_url(&req.endpoint);
        debug!(url = %url, "Sending request");

        let mut builder = self
            .inner
            .request(to_reqwest_method(req.method), &url)
            .headers(self.headers(&req.headers, true)?);
        if let Some(body) = &req.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let raw = self.exchange(builder).await?;
        decode(raw)
    }

    /// Sends `req`, retrying transient failures if the request is retry-safe.
    ///
    /// Idempotent methods (GET, PUT, DELETE) and requests marked
    /// [`ApiRequest::retry_safe`] are retried on timeouts, network errors
    /// and retryable statuses. Everything else is sent exactly once.
    pub async fn request_with_retry<T: DeserializeOwned>(
        &self,
        req: &ApiRequest,
        strategy: &RetryStrategy,
    ) -> Result<ApiResponse<T>, ApiError> {
        if !req.is_retry_safe() {
            debug!(method = %req.method, endpoint = %req.endpoint, "Not retry-safe, sending once");
            return self.request(req).await;
        }

        strategy
            .run_if(move || self.request(req), ApiError::is_retryable)
            .await
    }

    /// GET `endpoint`.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<ApiResponse<T>, ApiError> {
        self.request(&ApiRequest::get(endpoint)).await
    }

    /// POST `body` to `endpoint`.
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(&ApiRequest::post(endpoint).json(body)?).await
    }

    /// PUT `body` to `endpoint`.
    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(&ApiRequest::put(endpoint).json(body)?).await
    }

    /// PATCH `body` to `endpoint`.
    pub async fn patch<T, B>(&self, endpoint: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(&ApiRequest::patch(endpoint).json(body)?).await
    }

    /// DELETE `endpoint`.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(&ApiRequest::delete(endpoint)).await
    }

    /// POSTs a multipart form to `endpoint`.
    ///
    /// Same auth and timeout as [`ApiClient::request`], but no
    /// `Content-Type` is set so reqwest can add the multipart boundary. The
    /// response is always parsed as a JSON envelope.
    #[instrument(skip(self, form), fields(endpoint = %endpoint, files = form.files().len()))]
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: &UploadForm,
    ) -> Result<Envelope<T>, ApiError> {
        let url = self.config.endpoint_url(endpoint);
        debug!(url = %url, "Uploading");

        let builder = self
            .inner
            .post(&url)
            .headers(self.headers(&Default::default(), false)?)
            .multipart(form.to_multipart()?);

        let raw = self.exchange(builder).await?;
        if !raw.status.is_success() {
            return Err(ApiError::from_response(raw.status, &raw.body));
        }
        Ok(serde_json::from_str(&raw.body)?)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Default headers, then the token, then caller overrides.
    fn headers(
        &self,
        extra: &std::collections::BTreeMap<String, String>,
        json: bool,
    ) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if json {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(token) = self.tokens.get_token() {
            let mut value = HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|_| ApiError::Unknown("Stored token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Unknown(format!("Invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Unknown(format!("Invalid value for header {name}: {e}")))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Sends and reads the body, all under one timeout.
    ///
    /// When the timer wins the request future is dropped, which aborts the
    /// connection; a late response is never observed.
    async fn exchange(&self, builder: RequestBuilder) -> Result<RawResponse, ApiError> {
        let timeout = self.config.timeout;

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(RawResponse {
                status,
                content_type,
                body,
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(raw)) => {
                debug!(status = %raw.status, bytes = raw.body.len(), "Response received");
                Ok(raw)
            }
            Ok(Err(e)) => {
                let err = ApiError::from_reqwest(&e, timeout);
                warn!(error = %e, kind = err.kind(), "Request failed");
                Err(err)
            }
            Err(_) => {
                warn!(timeout = ?timeout, "Request timed out");
                Err(ApiError::Timeout(timeout))
            }
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

/// Turns a complete response into the caller-facing result.
fn decode<T: DeserializeOwned>(raw: RawResponse) -> Result<ApiResponse<T>, ApiError> {
    if !raw.status.is_success() {
        return Err(ApiError::from_response(raw.status, &raw.body));
    }

    if raw.content_type.as_deref().is_some_and(is_json_content_type) {
        Ok(ApiResponse::Json(serde_json::from_str(&raw.body)?))
    } else {
        Ok(ApiResponse::Text(raw.body))
    }
}

/// `application/json`, `application/problem+json` and the like.
fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("Application/Problem+JSON"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("text/html; charset=utf-8"));
    }

    #[test]
    fn test_decode_json_success() {
        let response: ApiResponse<Value> =
            decode(raw(200, Some("application/json"), r#"{"success":true,"data":[1,2]}"#)).unwrap();
        let envelope = response.into_envelope().unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data, Some(json!([1, 2])));
    }

    #[test]
    fn test_decode_success_with_structured_details() {
        let body = r#"{"success":true,"data":1,"details":{"k":"v"}}"#;
        let response: ApiResponse<Value> = decode(raw(200, Some("application/json"), body)).unwrap();
        let envelope = response.into_envelope().unwrap();
        assert_eq!(envelope.data, Some(json!(1)));
        assert_eq!(envelope.details, Some(json!({"k": "v"})));
    }

    #[test]
    fn test_decode_keeps_null_data() {
        let body = r#"{"success":true,"data":null}"#;
        let response: ApiResponse<Value> = decode(raw(200, Some("application/json"), body)).unwrap();
        let envelope = response.into_envelope().unwrap();
        assert_eq!(serde_json::to_string(&envelope).unwrap(), body);
    }

    #[test]
    fn test_decode_text_success() {
        let response: ApiResponse<Value> = decode(raw(200, Some("text/plain"), "pong")).unwrap();
        assert_eq!(response, ApiResponse::Text("pong".to_string()));

        let response: ApiResponse<Value> = decode(raw(204, None, "")).unwrap();
        assert_eq!(response.as_text(), Some(""));
    }

    #[test]
    fn test_decode_invalid_json_is_unknown() {
        let result: Result<ApiResponse<Value>, _> = decode(raw(200, Some("application/json"), "{"));
        assert!(matches!(result, Err(ApiError::Unknown(_))));
    }

    #[test]
    fn test_decode_error_status() {
        let result: Result<ApiResponse<Value>, _> =
            decode(raw(403, Some("application/json"), r#"{"message":"forbidden"}"#));
        assert_eq!(
            result.unwrap_err(),
            ApiError::Api {
                status: 403,
                message: "forbidden".to_string(),
                details: None
            }
        );
    }

    #[test]
    fn test_headers_defaults_and_overrides() {
        let tokens = TokenManager::in_memory();
        let client = ApiClient::new(ClientConfig::default(), tokens.clone()).unwrap();

        let headers = client.headers(&Default::default(), true).unwrap();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(header::AUTHORIZATION).is_none());

        tokens.set_token("a.b.c");
        let mut extra = std::collections::BTreeMap::new();
        extra.insert("content-type".to_string(), "text/csv".to_string());
        let headers = client.headers(&extra, true).unwrap();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/csv");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Token a.b.c");

        let headers = client.headers(&Default::default(), false).unwrap();
        assert!(headers.get(header::CONTENT_TYPE).is_none());
        assert!(headers.get(header::AUTHORIZATION).is_some());
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let client = ApiClient::new(ClientConfig::default(), TokenManager::in_memory()).unwrap();
        let mut extra = std::collections::BTreeMap::new();
        extra.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(client.headers(&extra, true), Err(ApiError::Unknown(_))));
    }
}
