//! Status command - check connectivity to the API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use heva_fetch::network::DEFAULT_PROBE_TIMEOUT;
use heva_fetch::{spawn_monitor, AnyProbe, ConnectivityProbe, HttpProbe, NetworkStatus};
use tracing::info;

use crate::context::resolve_config;
use crate::output::{self, StatusOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Keep probing and report every transition until interrupted.
    #[arg(long)]
    pub watch: bool,

    /// Probe interval in seconds for --watch.
    #[arg(long, short, default_value = "30")]
    pub interval: u64,

    /// Minimum interval to use.
    #[arg(long, default_value = "1")]
    pub min_interval: u64,
}

/// Runs the status command.
pub async fn run(args: &StatusArgs, cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let base_url = config.base_url.to_string();
    let mut probe = AnyProbe::new().with(Arc::new(HttpProbe::for_config(&config)?));
    if config.waitlist_url != config.base_url {
        probe = probe.with(Arc::new(HttpProbe::new(
            config.waitlist_url.as_str(),
            config.timeout.min(DEFAULT_PROBE_TIMEOUT),
        )?));
    }

    if !args.watch {
        let online = probe.check().await;
        return report(online, &base_url, cli);
    }

    let interval = args.interval.max(args.min_interval);
    info!(interval, "Starting connectivity watch");

    let status = NetworkStatus::default();
    let online = status.refresh(&probe).await;
    report(online, &base_url, cli)?;

    let subscription = {
        let base_url = base_url.clone();
        let format = cli.format;
        let pretty = cli.pretty;
        status.on_change(move |online| {
            let out = StatusOutput {
                online,
                base_url: base_url.clone(),
                checked_at: Utc::now(),
            };
            match format {
                OutputFormat::Json => match output::to_json(&out, pretty) {
                    Ok(line) => println!("{line}"),
                    Err(e) => eprintln!("Error: {e}"),
                },
                OutputFormat::Text => println!("{}", text_line(&out)),
            }
        })
    };

    let monitor = spawn_monitor(status, Arc::new(probe), Duration::from_secs(interval));
    tokio::signal::ctrl_c().await?;

    monitor.abort();
    subscription.unsubscribe();
    Ok(())
}

fn report(online: bool, base_url: &str, cli: &Cli) -> Result<()> {
    let out = StatusOutput {
        online,
        base_url: base_url.to_string(),
        checked_at: Utc::now(),
    };
    match cli.format {
        OutputFormat::Json => output::print_json(&out, cli),
        OutputFormat::Text => {
            println!("{}", text_line(&out));
            Ok(())
        }
    }
}

fn text_line(out: &StatusOutput) -> String {
    let state = if out.online { "online" } else { "offline" };
    format!(
        "[{}] {} is {state}",
        out.checked_at.format("%H:%M:%S"),
        out.base_url
    )
}
