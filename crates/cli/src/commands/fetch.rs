//! Fetch Command
//!
//! Requests a URL through the same transport the deploy checks use,
//! optionally pinned to one Edge server.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use edgecheck_e2e::{FetchOptions, HttpClient, HttpResponse, TransportConfig};

use crate::output::{print_item, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct FetchArgs {
    /// URL to request
    pub url: String,

    /// Send every request to this server (IP or hostname)
    #[arg(long, env = "EDGE_SERVER")]
    pub edge_server: Option<String>,

    /// Follow redirects instead of returning them
    #[arg(long)]
    pub follow: bool,

    /// Do not fail on non-2xx responses
    #[arg(long)]
    pub allow_failure: bool,

    /// Request header as `name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Send a POST request with this body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Ask the Edge server for fresh instances
    #[arg(long)]
    pub purge_instances: bool,
}

#[derive(Serialize)]
pub struct ResponseDisplay {
    pub url: String,
    pub status: u16,
    pub instance_id: Option<String>,
    pub journal_status: Option<String>,
    pub body: String,
}

impl From<&HttpResponse> for ResponseDisplay {
    fn from(response: &HttpResponse) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status.as_u16(),
            instance_id: response.instance_id().map(String::from),
            journal_status: response.journal_status().map(String::from),
            body: String::from_utf8_lossy(response.bytes()).into_owned(),
        }
    }
}

impl TableDisplay for ResponseDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["URL", "Status", "Instance", "Journal", "Body"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.url.clone(),
            self.status.to_string(),
            self.instance_id.clone().unwrap_or_else(|| "-".to_string()),
            self.journal_status.clone().unwrap_or_else(|| "-".to_string()),
            self.body.chars().take(200).collect(),
        ]
    }
}

/// Split a `name: value` header argument
pub fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Header must look like 'name: value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Header name is empty in '{}'", raw);
    }
    Ok((name, value.trim()))
}

fn build_options(args: &FetchArgs) -> Result<FetchOptions> {
    let mut options = match &args.data {
        Some(data) => FetchOptions::post(data.clone()),
        None => FetchOptions::get(),
    };
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value)?;
    }
    if args.follow {
        options = options.follow_redirects();
    }
    if args.allow_failure {
        options = options.allow_failure();
    }
    if args.purge_instances {
        options = options.purge_instances();
    }
    Ok(options)
}

pub async fn execute(args: FetchArgs, format: OutputFormat) -> Result<()> {
    let options = build_options(&args)?;
    let client = HttpClient::new(TransportConfig {
        accept_invalid_certs: args.edge_server.is_some(),
        target_server: args.edge_server.clone(),
    })?;

    let response = client.fetch(&args.url, &options).await?;

    match format {
        OutputFormat::Plain => {
            let status = if response.is_success() {
                response.status.to_string().green()
            } else {
                response.status.to_string().red()
            };
            eprintln!("{} {}", status, response.url.dimmed());
            print!("{}", String::from_utf8_lossy(response.bytes()));
        }
        _ => print_item(&ResponseDisplay::from(&response), format)?,
    }

    if !options.allow_failure && !response.is_success() {
        bail!("{} returned {}", args.url, response.status);
    }
    Ok(())
}
