//! Request command - call an API endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use heva_core::{Envelope, HttpMethod};
use heva_fetch::{ApiRequest, ApiResponse, RetryStrategy};
use serde_json::Value;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::output;
use crate::Cli;

/// Arguments for the request command.
#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method: GET, POST, PUT, PATCH or DELETE.
    pub method: String,

    /// Endpoint path relative to the base URL.
    pub endpoint: String,

    /// JSON body.
    #[arg(long, short)]
    pub data: Option<String>,

    /// Extra header as "Name: value". Repeatable.
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Retry transient failures up to N more times.
    #[arg(long, default_value = "0")]
    pub retry: u32,

    /// Allow retrying a POST or PATCH.
    #[arg(long)]
    pub retry_safe: bool,

    /// Cache a successful GET for this many milliseconds.
    #[arg(long)]
    pub cache_ttl_ms: Option<u64>,

    /// Ignore any cached response.
    #[arg(long)]
    pub no_cache: bool,
}

/// Runs the request command.
pub async fn run(args: &RequestArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;
    let req = build_request(args)?;

    let cache_key = cache_key(&req);
    let cache_ttl = args
        .cache_ttl_ms
        .filter(|_| req.method == HttpMethod::Get)
        .map(Duration::from_millis);

    if cache_ttl.is_some() && !args.no_cache {
        if let Some(envelope) = ctx.cache.get::<Envelope<Value>>(&cache_key) {
            debug!(key = %cache_key, "Serving cached response");
            return output::print_envelope(&envelope, cli);
        }
    }

    let client = ctx.api_client()?;
    info!(method = %req.method, endpoint = %req.endpoint, "Sending request");

    let result = if args.retry > 0 {
        let strategy = RetryStrategy::new(args.retry);
        client.request_with_retry::<Value>(&req, &strategy).await
    } else {
        client.request::<Value>(&req).await
    };
    let response = result.with_context(|| format!("{} {}", req.method, req.endpoint))?;

    if let (Some(ttl), ApiResponse::Json(envelope)) = (cache_ttl, &response) {
        ctx.cache.set(&cache_key, envelope, ttl);
    }

    output::print_response(&response, cli)
}

/// Turns the arguments into a request descriptor.
fn build_request(args: &RequestArgs) -> Result<ApiRequest> {
    let method: HttpMethod = args.method.parse()?;
    let mut req = ApiRequest::new(method, args.endpoint.clone()).retry_safe(args.retry_safe);

    if let Some(raw) = &args.data {
        let body: Value = serde_json::from_str(raw).context("--data must be valid JSON")?;
        req = req.body(body);
    }

    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        req = req.header(name, value);
    }

    Ok(req)
}

/// Splits `Name: value`.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header must look like \"Name: value\", got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Header name is empty in {raw:?}");
    }
    Ok((name, value.trim()))
}

/// Cache key for a GET: the endpoint with its leading slash normalized.
fn cache_key(req: &ApiRequest) -> String {
    format!("GET /{}", req.endpoint.trim_start_matches('/'))
}
