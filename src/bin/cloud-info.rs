//! CLI binary for the cloud-info crate.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use cloud_info::{CloudInfo, CloudInfoError, CloudInfoResult, Config};
use futures::future::join_all;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "cloud-info")]
#[command(
    author,
    version,
    about = "Check whether hosts belong to AWS, GCP, or Azure IP ranges"
)]
struct Cli {
    /// Hostnames or IP addresses to look up
    #[arg(required = true)]
    hosts: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Snapshot URL to fetch instead of the hosted default
    #[arg(long)]
    snapshot_url: Option<String>,

    /// Local snapshot file, used when the remote snapshot is unavailable
    #[arg(long)]
    snapshot_file: Option<PathBuf>,

    /// Do not fetch a remote snapshot
    #[arg(long, requires = "snapshot_file")]
    offline: bool,

    /// Timeout in milliseconds for DNS lookups and the snapshot download
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Logging verbosity
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    host: &'a str,
    #[serde(flatten)]
    result: CloudInfoResult,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .module("cloud_info")
        .verbosity(cli.verbose.log_level_filter())
        .init()
    {
        eprintln!("error: {}", e);
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();

    if let Some(url) = &cli.snapshot_url {
        config = config.with_snapshot_url(url);
    }
    if cli.offline {
        config = config.without_snapshot_url();
    }
    if let Some(path) = &cli.snapshot_file {
        config = config.with_snapshot_file(path);
    }
    if let Some(ms) = cli.timeout_ms {
        let timeout = Duration::from_millis(ms);
        config = config.with_fetch_timeout(timeout).with_dns_timeout(timeout);
    }
    config
}

/// Returns `Ok(false)` if any individual host failed.
async fn run(cli: Cli) -> Result<bool, CloudInfoError> {
    let cloud_info = CloudInfo::from_config(&build_config(&cli))?;

    let lookups = cli.hosts.iter().map(|host| cloud_info.query(Some(host.as_str())));
    let results = join_all(lookups).await;

    let mut all_ok = true;
    for (host, result) in cli.hosts.iter().zip(results) {
        match result {
            Ok(result) => print_result(cli.format, host, result)?,
            Err(e) => {
                eprintln!("{}: error: {}", host, e);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn print_result(
    format: OutputFormat,
    host: &str,
    result: CloudInfoResult,
) -> Result<(), CloudInfoError> {
    match format {
        OutputFormat::Text => {
            let providers: Vec<String> = result.providers().iter().map(|p| p.to_string()).collect();
            if providers.is_empty() {
                println!("{}: none", host);
            } else {
                println!("{}: {}", host, providers.join(", "));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&Report { host, result })?);
        }
    }
    Ok(())
}
