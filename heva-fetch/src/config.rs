//! Client configuration.
//!
//! Configuration is resolved once and handed to the client's constructor;
//! nothing in the request path reads the environment.

use std::time::Duration;

use heva_core::CoreError;
use tracing::debug;
use url::Url;

/// Default API base URL (local development backend).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Environment variable for the API base URL.
pub const BASE_URL_ENV: &str = "HEVA_API_URL";

/// Environment variable for the request timeout in milliseconds.
pub const TIMEOUT_ENV: &str = "HEVA_API_TIMEOUT_MS";

/// Environment variable for the waitlist base URL.
pub const WAITLIST_URL_ENV: &str = "HEVA_WAITLIST_URL";

/// User agent sent with every request.
const USER_AGENT: &str = concat!("heva/", env!("CARGO_PKG_VERSION"));

/// Settings for [`ApiClient`](crate::ApiClient) and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint is relative to.
    pub base_url: Url,
    /// Base URL of the waitlist micro-API.
    pub waitlist_url: Url,
    /// Whole-exchange timeout.
    pub timeout: Duration,
    /// User agent header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a config for `base_url` with default settings.
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            waitlist_url: base_url.clone(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        })
    }

    /// Reads `HEVA_API_URL`, `HEVA_API_TIMEOUT_MS` and `HEVA_WAITLIST_URL`.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base = var(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base)?;

        if let Some(raw) = var(TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                CoreError::InvalidConfig(format!("{TIMEOUT_ENV} must be milliseconds, got {raw:?}"))
            })?;
            config.timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = var(WAITLIST_URL_ENV) {
            config.waitlist_url = parse_base_url(&raw)?;
        }

        debug!(base_url = %config.base_url, timeout = ?config.timeout, "Resolved client config");
        Ok(config)
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the waitlist base URL.
    pub fn with_waitlist_url(mut self, url: &str) -> Result<Self, CoreError> {
        self.waitlist_url = parse_base_url(url)?;
        Ok(self)
    }

    /// Joins `endpoint` onto the base URL with exactly one `/` between them.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        join(&self.base_url, endpoint)
    }
}

impl Default for ClientConfig {
    /// Points at the local development backend.
    ///
    /// # Panics
    ///
    /// Panics only if [`DEFAULT_BASE_URL`] stops being a valid URL.
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
            .unwrap_or_else(|e| panic!("Default base URL is invalid: {e}"))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| CoreError::InvalidConfig(format!("invalid base URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CoreError::InvalidConfig(format!(
            "base URL must be http or https, got {other}"
        ))),
    }
}

pub(crate) fn join(base: &Url, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert_eq!(config.waitlist_url, config.base_url);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "https://api.example.com"),
            (TIMEOUT_ENV, "2500"),
            (WAITLIST_URL_ENV, "https://waitlist.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint_url("/scoring/score/"), "https://api.example.com/scoring/score/");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.waitlist_url.host_str(), Some("waitlist.example.com"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "not a url")])).is_err());
        assert!(ClientConfig::new("ftp://example.com").is_err());
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "  "), (TIMEOUT_ENV, "")])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_endpoint_join() {
        let config = ClientConfig::new("http://localhost:8000/api/").unwrap();
        assert_eq!(config.endpoint_url("users/me"), "http://localhost:8000/api/users/me");
        assert_eq!(config.endpoint_url("/users/me"), "http://localhost:8000/api/users/me");
        assert_eq!(config.endpoint_url("/"), "http://localhost:8000/api/");
    }
}
