//! One spin attempt, end to end.
//!
//! RequestVoucher → (activate + retry) → decode → estimate gas → funding
//! check → submit → receipt → counter sync → prize diff.

use alloy::primitives::U256;
use chrono::Utc;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::adapters::{wait_for_receipt, ChainClient, ClaimCall, HubApi, HubReply, TxParams};
use crate::config::SpinConfig;
use crate::domain::{Credential, PrizeSnapshot, SpinCounters, SpinOutcome, SpinVoucher};
use crate::error::{HubspinError, Result};
use crate::spin::auth::AuthSession;
use crate::spin::ledger::{self, PrizeLedger};

/// Body marker of a 403 when the daily spins are used up
pub const NO_SPINS_MARKER: &str = "exhausted your spins";
/// Body marker (case-insensitive) of a 404 for an unknown account
pub const NOT_FOUND_MARKER: &str = "not found";

/// Classified answer of the spin-request endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum VoucherResponse {
    Issued(Value),
    /// 2xx whose body is not JSON
    Unreadable(String),
    NoSpins,
    NotActivated,
}

impl VoucherResponse {
    /// 403 + marker → no spins, 404 + marker → not activated, other non-2xx
    /// → `Network` error, 2xx → voucher body
    pub fn classify(reply: HubReply) -> Result<Self> {
        if reply.status == 403 && reply.body.contains(NO_SPINS_MARKER) {
            return Ok(Self::NoSpins);
        }
        if reply.status == 404 && reply.body.to_lowercase().contains(NOT_FOUND_MARKER) {
            return Ok(Self::NotActivated);
        }
        let reply = reply.require_success("/spins")?;
        match serde_json::from_str(&reply.body) {
            Ok(body) => Ok(Self::Issued(body)),
            Err(e) => Ok(Self::Unreadable(format!("voucher body is not JSON: {}", e))),
        }
    }
}

/// `ceil(value * (100 + margin_pct) / 100)`
fn with_margin(value: U256, margin_pct: u64) -> U256 {
    let hundred = U256::from(100u64);
    (value * U256::from(100 + margin_pct) + U256::from(99u64)) / hundred
}

/// Funds needed to pay for `gas` at `gas_price`, plus the price-drift margin
pub fn required_funds(gas: u64, gas_price: u128, margin_pct: u64) -> U256 {
    with_margin(U256::from(gas) * U256::from(gas_price), margin_pct)
}

/// Gas limit for submission: the estimate plus the execution margin
pub fn gas_limit_with_margin(gas: u64, margin_pct: u64) -> u64 {
    let limit = with_margin(U256::from(gas), margin_pct);
    u64::try_from(limit).unwrap_or(u64::MAX)
}

/// `InsufficientFunds` unless `balance` covers the required amount
pub fn check_funding(balance: U256, gas: u64, gas_price: u128, margin_pct: u64) -> Result<U256> {
    let required = required_funds(gas, gas_price, margin_pct);
    if balance < required {
        return Err(HubspinError::InsufficientFunds {
            required: required.to_string(),
            balance: balance.to_string(),
        });
    }
    Ok(required)
}

pub struct SpinEngine<'a> {
    hub: &'a dyn HubApi,
    chain: &'a dyn ChainClient,
    auth: &'a AuthSession<'a>,
    ledger: &'a PrizeLedger<'a>,
    config: &'a SpinConfig,
    /// Wallet address, for logs
    label: String,
}

impl<'a> SpinEngine<'a> {
    pub fn new(
        hub: &'a dyn HubApi,
        chain: &'a dyn ChainClient,
        auth: &'a AuthSession<'a>,
        ledger: &'a PrizeLedger<'a>,
        config: &'a SpinConfig,
        label: impl Into<String>,
    ) -> Self {
        Self {
            hub,
            chain,
            auth,
            ledger,
            config,
            label: label.into(),
        }
    }

    pub async fn request_voucher(&self, credential: &Credential) -> Result<VoucherResponse> {
        let reply = self.hub.request_spin(credential.bearer()).await?;
        info!("({}) /spins: {} {}", self.label, reply.status, reply.snippet(200));
        VoucherResponse::classify(reply)
    }

    /// Run one attempt. `before` is the prize snapshot new rewards are diffed
    /// against.
    ///
    /// Hard errors (transport failures on the spin request, RPC failures,
    /// confirmation timeout) are returned as `Err`; everything the attempt can
    /// classify itself becomes a [`SpinOutcome`].
    pub async fn spin_once(
        &self,
        credential: &Credential,
        before: &PrizeSnapshot,
    ) -> Result<SpinOutcome> {
        let body = match self.request_voucher(credential).await? {
            VoucherResponse::Issued(body) => body,
            VoucherResponse::Unreadable(reason) => {
                error!("({}) {}", self.label, reason);
                return Ok(SpinOutcome::error(reason));
            }
            VoucherResponse::NoSpins => {
                warn!("({}) No spins left today, skipping", self.label);
                return Ok(SpinOutcome::NoSpins);
            }
            VoucherResponse::NotActivated => {
                warn!("({}) Account not activated, trying auto-activation", self.label);
                if !self.auth.activate_and_wait(credential).await {
                    error!("({}) Activation failed, skipping", self.label);
                    return Ok(SpinOutcome::NotActivated);
                }
                match self.request_voucher(credential).await? {
                    VoucherResponse::Issued(body) => body,
                    VoucherResponse::Unreadable(reason) => {
                        error!("({}) {}", self.label, reason);
                        return Ok(SpinOutcome::error(reason));
                    }
                    VoucherResponse::NoSpins => {
                        warn!("({}) No spins after activation, skipping", self.label);
                        return Ok(SpinOutcome::NoSpins);
                    }
                    VoucherResponse::NotActivated => {
                        error!("({}) Still not activated, skipping", self.label);
                        return Ok(SpinOutcome::NotActivated);
                    }
                }
            }
        };

        let voucher = match SpinVoucher::from_json(&body) {
            Ok(voucher) => voucher,
            Err(e) => {
                error!("({}) Could not decode voucher: {}", self.label, e);
                return Ok(SpinOutcome::error(e.to_string()));
            }
        };
        debug!("({}) Voucher: {:?}", self.label, voucher);

        if voucher.is_expired_at(Utc::now()) {
            warn!(
                "({}) Voucher expired at {}, not submitting",
                self.label, voucher.expiration_timestamp
            );
            return Ok(SpinOutcome::error("voucher expired"));
        }

        self.claim(credential, &voucher, before).await
    }

    async fn claim(
        &self,
        credential: &Credential,
        voucher: &SpinVoucher,
        before: &PrizeSnapshot,
    ) -> Result<SpinOutcome> {
        let call = ClaimCall::from(voucher);
        let gas_price = self.chain.gas_price().await?;

        let estimated_gas = match self.chain.estimate_claim_gas(&call).await {
            Ok(gas) => {
                info!("({}) Gas estimate: {}, gasPrice: {}", self.label, gas, gas_price);
                gas
            }
            Err(e) => {
                warn!(
                    "({}) Gas estimation failed: {}, using default {}",
                    self.label, e, self.config.default_gas
                );
                self.config.default_gas
            }
        };

        let balance = self.chain.balance().await?;
        if let Err(e) = check_funding(
            balance,
            estimated_gas,
            gas_price,
            self.config.funding_margin_pct,
        ) {
            warn!("({}) {}", self.label, e);
            return Ok(SpinOutcome::error(e.to_string()));
        }

        let baseline = self.read_counters(credential).await.1;

        let params = TxParams {
            gas_limit: gas_limit_with_margin(estimated_gas, self.config.gas_limit_margin_pct),
            gas_price,
            nonce: self.chain.transaction_count().await?,
        };
        let tx_hash = self.chain.send_claim(&call, params).await?;
        info!("({}) Tx sent: {:?}", self.label, tx_hash);

        let receipt = wait_for_receipt(
            self.chain,
            tx_hash,
            self.config.receipt_timeout(),
            self.config.receipt_poll_interval(),
        )
        .await?;
        if !receipt.success {
            let failure = HubspinError::TransactionFailed {
                tx_hash: format!("{tx_hash:?}"),
            };
            error!("({}) Transaction reverted: {:?}", self.label, tx_hash);
            return Ok(SpinOutcome::error(failure.to_string()));
        }
        info!(
            "({}) Success! Tx: {:?} | Gas used: {}",
            self.label, tx_hash, receipt.gas_used
        );

        if !self.await_counter_sync(credential, &baseline).await {
            warn!(
                "({}) Indexing is lagging (transaction succeeded anyway)",
                self.label
            );
        }

        let after = self.ledger.fetch_all(credential).await;
        let rewards: Vec<String> = ledger::diff(before, &after)
            .into_iter()
            .map(|p| p.display)
            .collect();
        if rewards.is_empty() {
            info!("({}) No new prizes (total={})", self.label, after.total);
        } else {
            info!("({}) New prizes: {}", self.label, rewards.join(", "));
        }

        Ok(SpinOutcome::Done {
            tx_hash: format!("{:?}", tx_hash),
            rewards,
        })
    }

    /// Status and counters of `/spins/today`; `(0, empty)` on transport errors
    pub async fn read_counters(&self, credential: &Credential) -> (u16, SpinCounters) {
        match self.hub.spins_today(credential.bearer()).await {
            Ok(reply) => {
                debug!("({}) /spins/today: {} {}", self.label, reply.status, reply.snippet(200));
                (reply.status, SpinCounters::from_json(&reply.json()))
            }
            Err(e) => {
                debug!("({}) /spins/today failed: {}", self.label, e);
                (0, SpinCounters::default())
            }
        }
    }

    /// Poll until the off-chain counters reflect the spin, or the window closes.
    /// Best effort: the outcome only feeds logging.
    pub async fn await_counter_sync(&self, credential: &Credential, baseline: &SpinCounters) -> bool {
        let started = Instant::now();
        let timeout = self.config.counter_sync_timeout();

        while started.elapsed() < timeout {
            tokio::time::sleep(self.config.counter_sync_interval()).await;
            let (_, current) = self.read_counters(credential).await;
            if current.advanced_from(baseline) {
                info!(
                    "({}) Counters updated: plays {:?}->{:?}, todaySpins {:?}->{:?}",
                    self.label,
                    baseline.plays,
                    current.plays,
                    baseline.today_spins,
                    current.today_spins
                );
                return true;
            }
        }
        false
    }

    /// Whether the hub still reports a spin for today
    pub async fn bonus_spin_available(&self, credential: &Credential) -> bool {
        let (status, counters) = self.read_counters(credential).await;
        let available = status == 200 && counters.has_spin_left();
        if available {
            info!("({}) Extra spin available, spinning again", self.label);
        }
        available
    }
}
