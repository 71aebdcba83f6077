//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Keychain error.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// Keychain refused access.
    #[error("Access denied to keychain")]
    KeychainAccessDenied,
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) => StoreError::KeychainAccessDenied,
            keyring::Error::PlatformFailure(e) => StoreError::Keychain(e.to_string()),
            _ => StoreError::Keychain(err.to_string()),
        }
    }
}
