use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

use crate::adapters::ProxyProbe;
use crate::batch::{read_lines, BatchRunner, LiveWalletJob, WalletSource};
use crate::config::AppConfig;
use crate::report::Report;
use crate::signing::build_challenge_message;

#[derive(Parser, Debug)]
#[command(name = "hubspin")]
#[command(version)]
#[command(about = "Claims the daily Linea Hub lucky spin for a list of wallets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path; without it `config/default.toml` and
    /// `config/$HUBSPIN_ENV` are layered
    #[arg(short, long, global = true, env = "HUBSPIN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spin every wallet once, plus any bonus spins (default)
    Run(RunArgs),
    /// Check every proxy in the proxies file
    CheckProxies {
        /// Proxies file (overrides files.proxies)
        #[arg(long)]
        proxies: Option<PathBuf>,
    },
    /// Print the sign-in message for an address and nonce
    Message {
        #[arg(long)]
        address: String,
        #[arg(long)]
        nonce: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Private keys file, one key per line
    #[arg(long)]
    pub keys: Option<PathBuf>,
    /// Proxies file, `host:port` or `user:pass@host:port` per line
    #[arg(long)]
    pub proxies: Option<PathBuf>,
    /// Wallets processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Skip the random pause between wallets
    #[arg(long)]
    pub no_delay: bool,
    /// CSV report path
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// JSON report path
    #[arg(long)]
    pub json: Option<PathBuf>,
}

impl RunArgs {
    /// Command-line values win over the config file
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(keys) = &self.keys {
            config.files.private_keys = keys.clone();
        }
        if let Some(proxies) = &self.proxies {
            config.files.proxies = proxies.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.batch.concurrency = concurrency;
        }
        if self.csv.is_some() {
            config.files.csv_report = self.csv.clone();
        }
        if self.json.is_some() {
            config.files.json_report = self.json.clone();
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let config = match &self.config {
            Some(path) => AppConfig::load_file(path)?,
            None => AppConfig::load()?,
        };
        Ok(config)
    }
}

/// Run the batch and print/save the report
pub async fn run_batch(config: &AppConfig, no_delay: bool) -> anyhow::Result<()> {
    if let Err(problems) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  {}", problems.join("\n  "));
    }

    let source = WalletSource::load(&config.files.private_keys, &config.files.proxies)?;
    if source.is_empty() {
        warn!(
            "No private keys in {}, nothing to do",
            config.files.private_keys.display()
        );
        return Ok(());
    }

    let mut runner = BatchRunner::new(&config.batch);
    if no_delay {
        runner = runner.without_pacing();
    }
    let job = LiveWalletJob::new(config.clone());

    let results = tokio::select! {
        results = runner.run(&source, &job) => results,
        _ = signal::ctrl_c() => {
            warn!("Interrupted, no report written");
            return Ok(());
        }
    };

    let report = Report::new(results);
    println!("\nRESULTS:\n{}", report.render_table());
    for (status, count) in report.summary() {
        info!("{}: {}", status, count);
    }

    if let Some(path) = &config.files.csv_report {
        match report.write_csv(path) {
            Ok(()) => info!("Report saved to {}", path.display()),
            Err(e) => warn!("Could not save {}: {}", path.display(), e),
        }
    }
    if let Some(path) = &config.files.json_report {
        match report.write_json(path) {
            Ok(()) => info!("JSON report saved to {}", path.display()),
            Err(e) => warn!("Could not save {}: {}", path.display(), e),
        }
    }
    Ok(())
}

pub async fn check_proxies(config: &AppConfig) -> anyhow::Result<()> {
    let probe = ProxyProbe::new(&config.endpoints, &config.batch);
    let lines = read_lines(&config.files.proxies)?;
    if lines.is_empty() {
        println!("(no proxies)");
        return Ok(());
    }

    let mut down = 0;
    for line in &lines {
        let proxy = match crate::adapters::ProxyEndpoint::parse(line) {
            Ok(proxy) => proxy,
            Err(e) => {
                println!("\x1b[31m✗ {}\x1b[0m", e);
                down += 1;
                continue;
            }
        };
        if probe.check_with_retries(&proxy).await {
            println!("\x1b[32m✓ {}\x1b[0m", proxy.display_host());
        } else {
            println!("\x1b[31m✗ {}\x1b[0m", proxy.display_host());
            down += 1;
        }
    }
    println!("{}/{} proxies up", lines.len() - down, lines.len());
    Ok(())
}

pub fn print_message(config: &AppConfig, address: &str, nonce: &str) {
    println!(
        "{}",
        build_challenge_message(&config.auth, address, nonce, Utc::now())
    );
}
