//! Batch driver: wallet inputs, per-wallet pipeline, paced worker pool.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use rand::Rng;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::adapters::proxy::assign;
use crate::adapters::{AlloyChainClient, HubClient, ProxyEndpoint, ProxyProbe};
use crate::config::{AppConfig, BatchConfig};
use crate::domain::{RunResult, RunStatus};
use crate::error::Result;
use crate::signing::Wallet;
use crate::spin::WalletRunner;

/// Address shown for wallets that failed before their key was parsed
pub const UNKNOWN_ADDRESS: &str = "-";

/// Trimmed, non-empty lines of a text file
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Private keys and proxies for one batch
pub struct WalletSource {
    keys: Vec<Zeroizing<String>>,
    proxies: Vec<ProxyEndpoint>,
}

impl WalletSource {
    pub fn new(keys: Vec<String>, proxies: Vec<ProxyEndpoint>) -> Self {
        Self {
            keys: keys.into_iter().map(Zeroizing::new).collect(),
            proxies,
        }
    }

    /// Keys file is required; a missing proxies file means direct connections.
    pub fn load(keys_path: &Path, proxies_path: &Path) -> Result<Self> {
        let keys = read_lines(keys_path)?;
        let proxies = if proxies_path.exists() {
            read_lines(proxies_path)?
                .iter()
                .map(|line| ProxyEndpoint::parse(line))
                .collect::<Result<Vec<_>>>()?
        } else {
            warn!(
                "Proxy file {} not found, wallets will connect directly",
                proxies_path.display()
            );
            Vec::new()
        };
        info!("Loaded {} keys and {} proxies", keys.len(), proxies.len());
        Ok(Self::new(keys, proxies))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn proxies(&self) -> &[ProxyEndpoint] {
        &self.proxies
    }

    /// Round-robin proxy for wallet `index`
    pub fn proxy_for(&self, index: usize) -> Option<&ProxyEndpoint> {
        assign(&self.proxies, index)
    }
}

impl std::fmt::Debug for WalletSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSource")
            .field("keys", &self.keys.len())
            .field("proxies", &self.proxies.len())
            .finish()
    }
}

/// Everything that happens to one wallet inside a batch
#[async_trait]
pub trait WalletJob: Send + Sync {
    async fn run(
        &self,
        index: usize,
        total: usize,
        private_key: &str,
        proxy: Option<&ProxyEndpoint>,
    ) -> RunResult;
}

/// Real pipeline: proxy check, key parsing, client setup, then the wallet run
pub struct LiveWalletJob {
    config: AppConfig,
    probe: ProxyProbe,
}

impl LiveWalletJob {
    pub fn new(config: AppConfig) -> Self {
        let probe = ProxyProbe::new(&config.endpoints, &config.batch);
        Self { config, probe }
    }
}

#[async_trait]
impl WalletJob for LiveWalletJob {
    async fn run(
        &self,
        index: usize,
        total: usize,
        private_key: &str,
        proxy: Option<&ProxyEndpoint>,
    ) -> RunResult {
        if let Some(proxy) = proxy {
            if !self.probe.check_with_retries(proxy).await {
                return RunResult::failed(
                    UNKNOWN_ADDRESS,
                    RunStatus::ProxyError,
                    format!("proxy {} unreachable", proxy.display_host()),
                );
            }
        }

        let wallet = match Wallet::from_private_key(private_key, self.config.chain.chain_id) {
            Ok(wallet) => wallet,
            Err(e) => {
                error!("(idx={}) {}", index, e);
                return RunResult::failed(UNKNOWN_ADDRESS, RunStatus::CriticalError, e.to_string());
            }
        };
        let address = wallet.checksum_address();
        info!(
            "({}/{}) Wallet: {} | Proxy: {}",
            index + 1,
            total,
            address,
            proxy.map(ProxyEndpoint::display_host).unwrap_or("direct")
        );

        let clients = HubClient::new(&self.config.endpoints, proxy).and_then(|hub| {
            AlloyChainClient::new(&self.config.chain, &wallet, proxy).map(|chain| (hub, chain))
        });
        let (hub, chain) = match clients {
            Ok(clients) => clients,
            Err(e) => {
                error!("({}) Client setup failed: {}", address, e);
                return RunResult::failed(address, RunStatus::CriticalError, e.to_string());
            }
        };

        WalletRunner::new(&hub, &chain, &self.config).run(&wallet).await
    }
}

/// Processes wallets through a bounded pool, results in input order
pub struct BatchRunner {
    concurrency: usize,
    delay_min_secs: u64,
    delay_max_secs: u64,
    pacing: bool,
}

impl BatchRunner {
    pub fn new(batch: &BatchConfig) -> Self {
        Self {
            concurrency: batch.concurrency.max(1),
            delay_min_secs: batch.delay_min_secs,
            delay_max_secs: batch.delay_max_secs.max(batch.delay_min_secs),
            pacing: true,
        }
    }

    /// Skip the random pause between wallets
    pub fn without_pacing(mut self) -> Self {
        self.pacing = false;
        self
    }

    /// Uniform pause from the configured window
    pub fn pause(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.delay_min_secs..=self.delay_max_secs);
        Duration::from_secs(secs)
    }

    pub async fn run(&self, source: &WalletSource, job: &dyn WalletJob) -> Vec<RunResult> {
        let total = source.len();
        info!(
            "Processing {} wallets (concurrency {})",
            total, self.concurrency
        );

        stream::iter(source.keys.iter().enumerate())
            .map(|(index, key)| async move {
                if index > 0 && self.pacing {
                    let pause = self.pause();
                    info!(
                        "Pausing {}s before wallet {}/{}",
                        pause.as_secs(),
                        index + 1,
                        total
                    );
                    tokio::time::sleep(pause).await;
                }
                let run = job.run(index, total, key.as_str(), source.proxy_for(index));
                match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => {
                        let reason = panic_reason(panic.as_ref());
                        error!("Wallet {}/{} panicked: {}", index + 1, total, reason);
                        RunResult::failed(
                            UNKNOWN_ADDRESS,
                            RunStatus::CriticalError,
                            format!("panic: {reason}"),
                        )
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown".to_string())
}
