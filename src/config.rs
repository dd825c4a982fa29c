use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoints: EndpointConfig,
    pub auth: AuthConfig,
    pub chain: ChainConfig,
    pub spin: SpinConfig,
    pub prizes: PrizeConfig,
    pub activation: ActivationConfig,
    pub batch: BatchConfig,
    pub files: FilesConfig,
    pub logging: LoggingConfig,
}

/// Remote endpoints used during a wallet run
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub nonce_url: String,
    pub verify_url: String,
    pub activate_url: String,
    pub users_me_url: String,
    pub spins_url: String,
    pub spins_today_url: String,
    pub prizes_url: String,
    /// IP echo endpoint used for the proxy connectivity check
    pub ip_check_url: String,
    /// Sent as `Origin`, and with a trailing slash as `Referer`
    pub origin: String,
    pub user_agent: String,
    /// Per-request timeout for hub calls
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        let sdk = "https://app.dynamicauth.com/api/v0/sdk/ae98b9b4-daaf-4bb3-b5e0-3f07175906ed";
        let hub = "https://hub-api.linea.build";
        Self {
            nonce_url: format!("{sdk}/nonce"),
            verify_url: format!("{sdk}/verify"),
            activate_url: format!("{hub}/auth"),
            users_me_url: format!("{hub}/users/me"),
            spins_url: format!("{hub}/spins"),
            spins_today_url: format!("{hub}/spins/today"),
            prizes_url: format!("{hub}/prizes/user"),
            ip_check_url: "https://httpbin.org/ip".to_string(),
            origin: "https://linea.build".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36"
                .to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Sign-in challenge template parameters
///
/// These must match the server's template byte for byte.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub domain: String,
    pub statement: String,
    pub uri: String,
    /// Chain id embedded in the challenge (not the transaction chain)
    pub chain_id: u64,
    pub request_id: String,
    pub wallet_name: String,
    pub wallet_provider: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: "linea.build".to_string(),
            statement: "Welcome to Linea Hub. Signing is the only way we can truly know that \
                        you are the owner of the wallet you are connecting. Signing is a safe, \
                        gas-less transaction that does not in any way give Linea Hub permission \
                        to perform any transactions with your wallet."
                .to_string(),
            uri: "https://linea.build/hub/rewards".to_string(),
            chain_id: 1,
            request_id: "ae98b9b4-daaf-4bb3-b5e0-3f07175906ed".to_string(),
            wallet_name: "rabby".to_string(),
            wallet_provider: "browserExtension".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Spin game contract exposing `participate`
    pub contract_address: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.linea.build".to_string(),
            chain_id: 59144,
            contract_address: "0xDb3a3929269281F157A58D91289185F21E30A1e0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Gas units used when estimation fails
    pub default_gas: u64,
    /// Safety margin on required funds, in percent of gas * price
    pub funding_margin_pct: u64,
    /// Margin on the transaction gas limit, in percent of the estimate
    pub gas_limit_margin_pct: u64,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub counter_sync_timeout_secs: u64,
    pub counter_sync_interval_ms: u64,
    /// Upper bound on spins (initial + bonus) per wallet run
    pub max_spins_per_wallet: u32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            default_gas: 250_000,
            funding_margin_pct: 15,
            gas_limit_margin_pct: 10,
            receipt_timeout_secs: 180,
            receipt_poll_interval_ms: 2_000,
            counter_sync_timeout_secs: 180,
            counter_sync_interval_ms: 6_000,
            max_spins_per_wallet: 10,
        }
    }
}

impl SpinConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn counter_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.counter_sync_timeout_secs)
    }

    pub fn counter_sync_interval(&self) -> Duration {
        Duration::from_millis(self.counter_sync_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrizeConfig {
    pub page_size: u32,
    /// Runaway-pagination guard
    pub max_pages: u32,
}

impl Default for PrizeConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub ready_attempts: u32,
    pub ready_interval_ms: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            ready_attempts: 10,
            ready_interval_ms: 1_000,
        }
    }
}

impl ActivationConfig {
    pub fn ready_interval(&self) -> Duration {
        Duration::from_millis(self.ready_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Wallets processed at the same time
    pub concurrency: usize,
    pub delay_min_secs: u64,
    pub delay_max_secs: u64,
    pub proxy_retries: u32,
    pub proxy_retry_delay_secs: u64,
    pub proxy_check_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            delay_min_secs: 15,
            delay_max_secs: 45,
            proxy_retries: 3,
            proxy_retry_delay_secs: 5,
            proxy_check_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    pub private_keys: PathBuf,
    pub proxies: PathBuf,
    pub csv_report: Option<PathBuf>,
    pub json_report: Option<PathBuf>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            private_keys: PathBuf::from("private_keys.txt"),
            proxies: PathBuf::from("proxies.txt"),
            csv_report: Some(PathBuf::from("results.csv")),
            json_report: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives, overridden by `RUST_LOG`
    pub level: String,
    /// Enable JSON formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info,hubspin=debug".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HUBSPIN_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (HUBSPIN_SPIN__DEFAULT_GAS)
            .add_source(
                Environment::with_prefix("HUBSPIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load a single config file (plus environment overrides)
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("HUBSPIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.batch.concurrency == 0 {
            errors.push("batch.concurrency must be at least 1".to_string());
        }

        if self.batch.delay_min_secs > self.batch.delay_max_secs {
            errors.push("batch.delay_min_secs must not exceed batch.delay_max_secs".to_string());
        }

        if self.prizes.page_size == 0 || self.prizes.max_pages == 0 {
            errors.push("prizes.page_size and prizes.max_pages must be positive".to_string());
        }

        if self.spin.max_spins_per_wallet == 0 {
            errors.push("spin.max_spins_per_wallet must be at least 1".to_string());
        }

        if self.spin.counter_sync_interval_ms == 0 || self.spin.receipt_poll_interval_ms == 0 {
            errors.push("poll intervals must be positive".to_string());
        }

        if self.chain.contract_address.parse::<alloy::primitives::Address>().is_err() {
            errors.push(format!(
                "chain.contract_address is not a valid address: {}",
                self.chain.contract_address
            ));
        }

        for (name, url) in [
            ("endpoints.nonce_url", &self.endpoints.nonce_url),
            ("endpoints.verify_url", &self.endpoints.verify_url),
            ("endpoints.spins_url", &self.endpoints.spins_url),
            ("chain.rpc_url", &self.chain.rpc_url),
        ] {
            if url::Url::parse(url).is_err() {
                errors.push(format!("{name} is not a valid URL: {url}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
