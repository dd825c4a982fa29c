//! Outbound proxy assignment and connectivity probe.

use std::time::Duration;
use tracing::{info, warn};

use crate::config::{BatchConfig, EndpointConfig};
use crate::error::{HubspinError, Result};

/// `host:port` or `user:pass@host:port`, HTTP CONNECT proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    raw: String,
}

impl ProxyEndpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let raw = raw
            .strip_prefix("http://")
            .or_else(|| raw.strip_prefix("https://"))
            .unwrap_or(raw);
        if raw.is_empty() {
            return Err(HubspinError::Proxy("empty proxy line".to_string()));
        }
        let endpoint = Self {
            raw: raw.to_string(),
        };
        url::Url::parse(&endpoint.url())
            .map_err(|e| HubspinError::Proxy(format!("invalid proxy {raw}: {e}")))?;
        Ok(endpoint)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.raw)
    }

    /// Host part only, safe for logs
    pub fn display_host(&self) -> &str {
        self.raw.rsplit('@').next().unwrap_or(&self.raw)
    }

    pub fn reqwest_proxy(&self) -> Result<reqwest::Proxy> {
        reqwest::Proxy::all(self.url())
            .map_err(|e| HubspinError::Proxy(format!("invalid proxy {}: {}", self.display_host(), e)))
    }
}

/// Round-robin proxy for wallet `index`; `None` when the list is empty
pub fn assign(proxies: &[ProxyEndpoint], index: usize) -> Option<&ProxyEndpoint> {
    if proxies.is_empty() {
        None
    } else {
        proxies.get(index % proxies.len())
    }
}

/// Checks that a proxy answers before a wallet run uses it.
///
/// Fixed retry count and fixed delay, no backoff.
pub struct ProxyProbe {
    ip_check_url: String,
    retries: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl ProxyProbe {
    pub fn new(endpoints: &EndpointConfig, batch: &BatchConfig) -> Self {
        Self {
            ip_check_url: endpoints.ip_check_url.clone(),
            retries: batch.proxy_retries.max(1),
            retry_delay: Duration::from_secs(batch.proxy_retry_delay_secs),
            timeout: Duration::from_secs(batch.proxy_check_timeout_secs),
        }
    }

    /// Egress IP seen through the proxy
    pub async fn check_once(&self, proxy: &ProxyEndpoint) -> Result<String> {
        let client = reqwest::Client::builder()
            .proxy(proxy.reqwest_proxy()?)
            .timeout(self.timeout)
            .build()?;
        let body: serde_json::Value = client
            .get(&self.ip_check_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body
            .get("origin")
            .and_then(|v| v.as_str())
            .unwrap_or("?")
            .to_string())
    }

    pub async fn check_with_retries(&self, proxy: &ProxyEndpoint) -> bool {
        for attempt in 1..=self.retries {
            match self.check_once(proxy).await {
                Ok(ip) => {
                    info!("Proxy {} is up. IP: {}", proxy.display_host(), ip);
                    return true;
                }
                Err(e) if attempt < self.retries => {
                    warn!(
                        "Proxy {} did not answer (attempt {}/{}): {}. Retrying in {}s",
                        proxy.display_host(),
                        attempt,
                        self.retries,
                        e,
                        self.retry_delay.as_secs()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        "Proxy {} is down after {} attempts: {}",
                        proxy.display_host(),
                        self.retries,
                        e
                    );
                }
            }
        }
        false
    }
}
