//! Cache command - inspect or clear cached responses.

use anyhow::Result;
use clap::{Args, Subcommand};
use heva_store::TtlCache;
use serde_json::Value;

use crate::context::AppContext;
use crate::output::{self, from_millis, CacheEntryOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the cache command.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached keys with their expiry.
    List,

    /// Print a cached value.
    Get {
        /// Cache key.
        key: String,
    },

    /// Remove one entry.
    Remove {
        /// Cache key.
        key: String,
    },

    /// Remove every cached entry. The stored token is kept.
    Clear,

    /// Show the storage file path.
    Path,
}

/// Runs the cache command.
pub fn run(args: &CacheArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;

    match &args.action {
        CacheAction::List => list(&ctx.cache, cli),
        CacheAction::Get { key } => match ctx.cache.get::<Value>(key) {
            Some(value) => output::print_json(&value, cli),
            None => anyhow::bail!("No fresh cache entry for {key:?}"),
        },
        CacheAction::Remove { key } => {
            ctx.cache.remove(key);
            if !cli.quiet {
                println!("Removed {key}");
            }
            Ok(())
        }
        CacheAction::Clear => {
            let count = ctx.cache.keys().len();
            ctx.cache.clear();
            if !cli.quiet {
                println!("Cleared {count} cache entries");
            }
            Ok(())
        }
        CacheAction::Path => {
            println!("{}", ctx.storage.path().display());
            Ok(())
        }
    }
}

fn entries(cache: &TtlCache) -> Vec<CacheEntryOutput> {
    cache
        .keys()
        .into_iter()
        .map(|key| {
            let entry = cache.peek(&key);
            let stored_at = entry.as_ref().and_then(|e| from_millis(e.timestamp));
            let expires_at = entry.as_ref().and_then(|e| {
                let ttl = i64::try_from(e.ttl).ok()?;
                from_millis(e.timestamp.checked_add(ttl)?)
            });
            CacheEntryOutput {
                expired: cache.is_expired(&key),
                key,
                stored_at,
                expires_at,
            }
        })
        .collect()
}

fn list(cache: &TtlCache, cli: &Cli) -> Result<()> {
    let entries = entries(cache);

    match cli.format {
        OutputFormat::Json => output::print_json(&entries, cli),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("Cache is empty");
                return Ok(());
            }
            for entry in &entries {
                let expiry = entry
                    .expires_at
                    .map_or_else(|| "unreadable".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
                let marker = if entry.expired { " (expired)" } else { "" };
                println!("{:<40} {expiry}{marker}", entry.key);
            }
            Ok(())
        }
    }
}
