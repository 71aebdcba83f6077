//! Client for the waitlist micro-API.
//!
//! The waitlist service sits outside the main API: it takes no token and
//! does not follow the envelope contract, so responses are normalized by
//! the models in [`heva_core`].

use std::time::Duration;

use heva_core::{WaitlistCount, WaitlistEntry, WaitlistStatus};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Client for `/waitlist/*`.
#[derive(Debug, Clone)]
pub struct WaitlistClient {
    inner: Client,
    base_url: Url,
    timeout: Duration,
}

impl WaitlistClient {
    /// Creates a client for the waitlist base URL in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let inner = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url: config.waitlist_url.clone(),
            timeout: config.timeout,
        })
    }

    /// `POST /waitlist/join`.
    #[instrument(skip(self))]
    pub async fn join(&self, email: &str, name: Option<&str>) -> Result<WaitlistEntry, ApiError> {
        let mut body = json!({ "email": email });
        if let Some(name) = name {
            body["name"] = Value::String(name.to_string());
        }

        let value = self.call(Method::POST, &["waitlist", "join"], Some(&body)).await?;
        Ok(WaitlistEntry::from_response(&value, email, name))
    }

    /// `GET /waitlist/count`.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<WaitlistCount, ApiError> {
        let value = self.call(Method::GET, &["waitlist", "count"], None).await?;
        WaitlistCount::from_response(&value)
            .ok_or_else(|| ApiError::Unknown(format!("Unrecognized waitlist count response: {value}")))
    }

    /// `GET /waitlist/check/:email`.
    #[instrument(skip(self))]
    pub async fn check(&self, email: &str) -> Result<WaitlistStatus, ApiError> {
        let value = self.call(Method::GET, &["waitlist", "check", email], None).await?;
        WaitlistStatus::from_response(&value, email)
            .ok_or_else(|| ApiError::Unknown(format!("Unrecognized waitlist check response: {value}")))
    }

    /// Builds the URL from percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Unknown(format!("Cannot append a path to {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(segments)?;
        debug!(url = %url, method = %method, "Waitlist request");

        let mut builder = self.inner.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(ApiError::from_reqwest(&e, self.timeout)),
            Err(_) => return Err(ApiError::Timeout(self.timeout)),
        };

        if !status.is_success() {
            return Err(ApiError::from_response(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
