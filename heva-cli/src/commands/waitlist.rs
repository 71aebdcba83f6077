//! Waitlist command - join, count and check the waitlist.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::context::AppContext;
use crate::output;
use crate::{Cli, OutputFormat};

/// Arguments for the waitlist command.
#[derive(Args)]
pub struct WaitlistArgs {
    #[command(subcommand)]
    pub action: WaitlistAction,
}

/// Waitlist subcommands.
#[derive(Subcommand)]
pub enum WaitlistAction {
    /// Join the waitlist.
    Join {
        /// Email to register.
        email: String,

        /// Display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show how many people are waiting.
    Count,

    /// Check whether an email is registered.
    Check {
        /// Email to look up.
        email: String,
    },
}

/// Runs the waitlist command.
pub async fn run(args: &WaitlistArgs, cli: &Cli) -> Result<()> {
    let client = AppContext::load(cli)?.waitlist_client()?;

    match &args.action {
        WaitlistAction::Join { email, name } => {
            let entry = client
                .join(email, name.as_deref())
                .await
                .context("waitlist join")?;
            match cli.format {
                OutputFormat::Json => output::print_json(&entry, cli)?,
                OutputFormat::Text => match entry.position {
                    Some(position) => println!("{} joined at position {position}", entry.email),
                    None => println!("{} joined the waitlist", entry.email),
                },
            }
        }
        WaitlistAction::Count => {
            let count = client.count().await.context("waitlist count")?;
            match cli.format {
                OutputFormat::Json => output::print_json(&count, cli)?,
                OutputFormat::Text => println!("{} on the waitlist", count.count),
            }
        }
        WaitlistAction::Check { email } => {
            let status = client.check(email).await.context("waitlist check")?;
            match cli.format {
                OutputFormat::Json => output::print_json(&status, cli)?,
                OutputFormat::Text if status.on_waitlist => println!("{email} is on the waitlist"),
                OutputFormat::Text => println!("{email} is not on the waitlist"),
            }
        }
    }

    Ok(())
}
