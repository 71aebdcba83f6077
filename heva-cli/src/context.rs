//! Shared state for CLI commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use heva_fetch::{ApiClient, ClientConfig, WaitlistClient};
use heva_store::{FileStorage, KeychainTokenStore, StorageTokenStore, TokenManager, TtlCache};
use tracing::debug;

use crate::Cli;

/// Resolved config plus the local token and cache, opened once per run.
pub struct AppContext {
    pub config: ClientConfig,
    pub storage: Arc<FileStorage>,
    pub tokens: TokenManager,
    pub cache: TtlCache,
    pub token_source: &'static str,
}

impl AppContext {
    /// Builds the context from the environment and global flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config = resolve_config(cli)?;

        let storage = Arc::new(match &cli.storage {
            Some(path) => FileStorage::open(path),
            None => FileStorage::open_default(),
        });
        debug!(path = %storage.path().display(), "Opened storage");

        let (tokens, token_source) = if cli.keychain {
            (TokenManager::new(KeychainTokenStore::new()), "keychain")
        } else {
            (
                TokenManager::new(StorageTokenStore::new(storage.clone())),
                "storage",
            )
        };

        let cache = TtlCache::new(storage.clone());

        Ok(Self {
            config,
            storage,
            tokens,
            cache,
            token_source,
        })
    }

    /// Builds an API client sharing this context's token.
    pub fn api_client(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(self.config.clone(), self.tokens.clone())?)
    }

    /// Builds a waitlist client.
    pub fn waitlist_client(&self) -> Result<WaitlistClient> {
        Ok(WaitlistClient::new(&self.config)?)
    }
}

/// Environment first, then `--base-url` and `--timeout-ms` on top.
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("Invalid client configuration")?;

    if let Some(base_url) = &cli.base_url {
        let waitlist_url = config.waitlist_url.clone();
        let defaulted_waitlist = waitlist_url == config.base_url;
        config = ClientConfig {
            timeout: config.timeout,
            ..ClientConfig::new(base_url).context("Invalid --base-url")?
        };
        if !defaulted_waitlist {
            config.waitlist_url = waitlist_url;
        }
    }

    if let Some(millis) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(millis));
    }

    Ok(config)
}
