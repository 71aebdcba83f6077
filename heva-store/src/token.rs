//! Bearer token management.
//!
//! [`TokenManager`] is the one place the client reads the current token
//! from. Where the token lives is decided by the [`TokenStore`] behind it:
//! local storage ([`StorageTokenStore`]), the OS keychain
//! ([`KeychainTokenStore`](crate::KeychainTokenStore)), or anything else
//! implementing the trait.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::storage::Storage;

/// Storage key the token is kept under.
pub const TOKEN_KEY: &str = "auth_token";

// ============================================================================
// Token Store Trait
// ============================================================================

/// Persistent home of the bearer token.
pub trait TokenStore: Send + Sync {
    /// Returns the stored token.
    fn get(&self) -> Option<String>;

    /// Stores `token`, replacing any previous one.
    fn set(&self, token: &str) -> Result<(), StoreError>;

    /// Deletes the stored token.
    fn remove(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Storage-backed Token Store
// ============================================================================

/// Keeps the token as a raw string under [`TOKEN_KEY`] in a [`Storage`].
pub struct StorageTokenStore {
    storage: Arc<dyn Storage>,
    key: String,
}

impl StorageTokenStore {
    /// Uses the default key.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, TOKEN_KEY)
    }

    /// Uses a custom key.
    pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

impl fmt::Debug for StorageTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageTokenStore").field("key", &self.key).finish()
    }
}

impl TokenStore for StorageTokenStore {
    fn get(&self) -> Option<String> {
        self.storage.get_item(&self.key)
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        self.storage.set_item(&self.key, token)
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.storage.remove_item(&self.key)
    }
}

// ============================================================================
// Token Manager
// ============================================================================

/// Single source of truth for the current bearer token.
///
/// Cloning is cheap; clones share the same store. No method returns an
/// error: store failures are logged and reads of empty values come back
/// as `None`.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
}

impl TokenManager {
    /// Creates a manager over `store`.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Creates a manager over a shared store.
    pub fn from_shared(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Creates a manager backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(StorageTokenStore::new(Arc::new(
            crate::storage::MemoryStorage::new(),
        )))
    }

    /// Returns the stored token, if any.
    pub fn get_token(&self) -> Option<String> {
        self.store.get().filter(|t| !t.trim().is_empty())
    }

    /// Persists `token`, overwriting the previous value.
    #[instrument(skip(self, token))]
    pub fn set_token(&self, token: &str) {
        match self.store.set(token) {
            Ok(()) => debug!("Token stored"),
            Err(e) => warn!(error = %e, "Failed to store token"),
        }
    }

    /// Clears the stored token.
    #[instrument(skip(self))]
    pub fn remove_token(&self) {
        match self.store.remove() {
            Ok(()) => debug!("Token removed"),
            Err(e) => warn!(error = %e, "Failed to remove token"),
        }
    }

    /// Returns true if a token is present and has the three dot-separated
    /// segments of a JWT.
    ///
    /// Shape check only. Neither the signature nor the expiry is verified,
    /// so this must not be used as an authorization decision.
    pub fn is_token_valid(&self) -> bool {
        self.get_token()
            .is_some_and(|token| token.split('.').count() == 3)
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("has_token", &self.get_token().is_some())
            .finish()
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::in_memory()
    }
}
