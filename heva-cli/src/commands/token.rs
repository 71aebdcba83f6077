//! Token command - manage the stored bearer token.

use anyhow::Result;
use clap::{Args, Subcommand};
use heva_store::TokenManager;

use crate::context::AppContext;
use crate::output::{self, mask_token, TokenOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the token command.
#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenAction {
    /// Show whether a token is stored and well-formed.
    Show,

    /// Store a token.
    Set {
        /// The token.
        token: String,
    },

    /// Delete the stored token.
    Remove,
}

/// Runs the token command.
pub fn run(args: &TokenArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;

    match &args.action {
        TokenAction::Show => {}
        TokenAction::Set { token } => {
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("Token is empty");
            }
            ctx.tokens.set_token(token);
        }
        TokenAction::Remove => ctx.tokens.remove_token(),
    }

    show(&ctx.tokens, ctx.token_source, cli)
}

fn show(tokens: &TokenManager, source: &str, cli: &Cli) -> Result<()> {
    let token = tokens.get_token();
    let out = TokenOutput {
        present: token.is_some(),
        valid: tokens.is_token_valid(),
        source: source.to_string(),
        preview: token.as_deref().map(mask_token),
    };

    match cli.format {
        OutputFormat::Json => output::print_json(&out, cli),
        OutputFormat::Text => {
            match (&out.preview, out.valid) {
                (None, _) => println!("No token stored ({source})"),
                (Some(preview), true) => println!("Token {preview} ({source})"),
                (Some(preview), false) => {
                    println!("Token {preview} ({source}) is not a well-formed JWT");
                }
            }
            Ok(())
        }
    }
}
