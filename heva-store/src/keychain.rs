//! Token storage in the system keychain.
//!
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)

use keyring::Entry;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::token::{TokenStore, TOKEN_KEY};

/// Default keychain service name.
pub const DEFAULT_SERVICE: &str = "heva";

/// Keeps the bearer token in the OS keychain instead of the storage file.
#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    service: String,
    account: String,
}

impl KeychainTokenStore {
    /// Uses service `heva` and account `auth_token`.
    pub fn new() -> Self {
        Self::with_names(DEFAULT_SERVICE, TOKEN_KEY)
    }

    /// Uses a custom service and account.
    pub fn with_names(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Entry::new(&self.service, &self.account).map_err(StoreError::from)
    }
}

impl Default for KeychainTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeychainTokenStore {
    fn get(&self) -> Option<String> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to create keychain entry");
                return None;
            }
        };

        match entry.get_password() {
            Ok(secret) if !secret.is_empty() => Some(secret),
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "No token in keychain");
                None
            }
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to read token from keychain");
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        self.entry()?.set_password(token)?;
        debug!(service = %self.service, "Token stored in keychain");
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
