// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! HEVA+ CLI - talk to the HEVA+ API from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Store a token, then call an authenticated endpoint
//! heva token set eyJhbGciOi.eyJzdWIiOi.c2lnbmF0dXJl
//! heva request GET /scoring/score/
//!
//! # Send a JSON body, retrying on transient failures
//! heva request PUT /profile/ --data '{"sector":"design"}' --retry 3
//!
//! # Memoize a GET for ten minutes
//! heva request GET /scoring/history/ --cache-ttl-ms 600000
//!
//! # Upload a document
//! heva upload /documents/upload/ --file facture.pdf -F kind=invoice
//!
//! # Watch connectivity
//! heva status --watch --interval 10
//! ```

mod commands;
mod context;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use heva_fetch::ApiError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{cache, request, status, token, upload, waitlist};

// ============================================================================
// CLI Definition
// ============================================================================

/// HEVA+ CLI - resilient HTTP client for the HEVA+ API.
#[derive(Parser)]
#[command(name = "heva")]
#[command(about = "Command-line client for the HEVA+ API")]
#[command(long_about = r#"
Calls the HEVA+ API with the same token handling, timeouts, retries and
local caching as the web frontend.

Environment:
  HEVA_API_URL          API base URL (default http://localhost:8000/api)
  HEVA_API_TIMEOUT_MS   Request timeout in milliseconds (default 10000)
  HEVA_WAITLIST_URL     Waitlist base URL (default: the API base URL)

Examples:
  heva token set <jwt>               # Store the bearer token
  heva request GET /users/me/        # Authenticated GET
  heva cache clear                   # Drop cached responses
  heva waitlist count                # Waitlist size
"#)]
#[command(version)]
#[command(author = "HEVA+ Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// API base URL (overrides HEVA_API_URL).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds (overrides HEVA_API_TIMEOUT_MS).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Storage file for the token and cache.
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Keep the token in the system keychain instead of the storage file.
    #[arg(long, global = true)]
    pub keychain: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Send a request to an API endpoint.
    #[command(visible_alias = "r")]
    Request(request::RequestArgs),

    /// Upload files as multipart form data.
    #[command(visible_alias = "u")]
    Upload(upload::UploadArgs),

    /// Manage the bearer token.
    #[command(visible_alias = "t")]
    Token(token::TokenArgs),

    /// Inspect or clear the response cache.
    #[command(visible_alias = "c")]
    Cache(cache::CacheArgs),

    /// Check connectivity to the API.
    #[command(visible_alias = "s")]
    Status(status::StatusArgs),

    /// Waitlist operations.
    #[command(visible_alias = "w")]
    Waitlist(waitlist::WaitlistArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// The API did not answer in time.
    Timeout = 4,
    /// The API could not be reached.
    Network = 5,
    /// The API answered with an error status.
    Api = 6,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Timeout(_)) => ExitCode::Timeout,
            Some(ApiError::Network(_)) => ExitCode::Network,
            Some(ApiError::Api { .. }) => ExitCode::Api,
            Some(ApiError::Unknown(_)) | None => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("heva=debug,info")
    } else {
        EnvFilter::new("heva=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Request(args) => request::run(args, &cli).await,
        Commands::Upload(args) => upload::run(args, &cli).await,
        Commands::Token(args) => token::run(args, &cli),
        Commands::Cache(args) => cache::run(args, &cli),
        Commands::Status(args) => status::run(args, &cli).await,
        Commands::Waitlist(args) => waitlist::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
