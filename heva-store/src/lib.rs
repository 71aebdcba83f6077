// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # HEVA Store
//!
//! Client-local state for the HEVA+ API client.
//!
//! This crate provides:
//!
//! - **Storage**: a string key/value store, in memory or backed by a JSON file
//! - **TokenManager**: the single source of truth for the bearer token
//! - **KeychainTokenStore**: token storage in the OS keychain
//! - **TtlCache**: namespaced response cache with lazy expiry
//! - **Persistence**: file I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use heva_store::{FileStorage, StorageTokenStore, TokenManager, TtlCache};
//!
//! let storage = Arc::new(FileStorage::open_default());
//!
//! let tokens = TokenManager::new(StorageTokenStore::new(storage.clone()));
//! tokens.set_token("header.payload.signature");
//! assert!(tokens.is_token_valid());
//!
//! let cache = TtlCache::new(storage);
//! cache.set("score", &712, Duration::from_secs(60));
//! let score: Option<u32> = cache.get("score");
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod keychain;
pub mod persistence;
pub mod storage;
pub mod token;

pub use cache::{CacheEntry, TtlCache, CACHE_PREFIX, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use keychain::KeychainTokenStore;
pub use persistence::{default_data_dir, default_storage_path, load_json, save_json};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use token::{StorageTokenStore, TokenManager, TokenStore, TOKEN_KEY};
