//! Full run for one wallet: credential, baseline snapshot, spin loop, streak.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::adapters::{ChainClient, HubApi};
use crate::config::AppConfig;
use crate::domain::outcome::streak_from_json;
use crate::domain::{
    Credential, PrizeSnapshot, RunResult, RunStatus, SpinOutcome, NO_PRIZE, NO_REWARD,
};
use crate::error::Result;
use crate::signing::Wallet;
use crate::spin::auth::AuthSession;
use crate::spin::engine::SpinEngine;
use crate::spin::ledger::PrizeLedger;

/// What the spin loop has seen so far
#[derive(Debug, Default)]
struct SpinTally {
    spins_done: u32,
    rewards: Vec<String>,
    last: Option<SpinOutcome>,
}

impl SpinTally {
    fn record(&mut self, outcome: SpinOutcome) {
        if let SpinOutcome::Done { rewards, .. } = &outcome {
            self.spins_done += 1;
            self.rewards
                .extend(rewards.iter().filter(|r| !r.is_empty()).cloned());
        }
        self.last = Some(outcome);
    }

    fn reward_label(&self) -> String {
        if self.rewards.is_empty() {
            NO_PRIZE.to_string()
        } else {
            self.rewards.join(", ")
        }
    }

    fn into_result(
        self,
        address: String,
        streak: Option<u64>,
        failure: Option<String>,
    ) -> RunResult {
        let (status, reward, detail) = match failure {
            Some(reason) => {
                let reward = if self.spins_done > 0 {
                    self.reward_label()
                } else {
                    NO_REWARD.to_string()
                };
                (RunStatus::CriticalError, reward, Some(reason))
            }
            None if self.spins_done > 0 => (RunStatus::Spun, self.reward_label(), None),
            None => match self.last {
                Some(SpinOutcome::Error { reason }) => {
                    (RunStatus::Error, NO_REWARD.to_string(), Some(reason))
                }
                Some(ref outcome) => (
                    RunStatus::from_last_outcome(outcome),
                    NO_REWARD.to_string(),
                    None,
                ),
                None => (RunStatus::Error, NO_REWARD.to_string(), None),
            },
        };

        RunResult {
            address,
            streak,
            status,
            reward,
            detail,
        }
    }
}

/// Drives one wallet against its own hub and chain clients
pub struct WalletRunner<'a> {
    hub: &'a dyn HubApi,
    chain: &'a dyn ChainClient,
    config: &'a AppConfig,
}

impl<'a> WalletRunner<'a> {
    pub fn new(hub: &'a dyn HubApi, chain: &'a dyn ChainClient, config: &'a AppConfig) -> Self {
        Self { hub, chain, config }
    }

    /// Never fails: every way a run can end is a [`RunResult`].
    pub async fn run(&self, wallet: &Wallet) -> RunResult {
        let address = wallet.checksum_address();
        let session = AuthSession::new(self.hub, &self.config.auth, &self.config.activation);
        let ledger = PrizeLedger::new(self.hub, &self.config.prizes);

        let credential = match session.sign_and_verify(wallet).await {
            Ok(credential) => credential,
            Err(e) => {
                error!("({}) Could not obtain bearer token: {}", address, e);
                return RunResult::failed(address, RunStatus::AuthError, e.to_string());
            }
        };

        let mut before = ledger.fetch_all(&credential).await;
        info!("({}) Prizes before spin: {}", address, before.total);

        let engine = SpinEngine::new(
            self.hub,
            self.chain,
            &session,
            &ledger,
            &self.config.spin,
            address.clone(),
        );

        let mut tally = SpinTally::default();
        let failure = match self
            .spin_loop(&address, &engine, &ledger, &credential, &mut before, &mut tally)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                error!("({}) Run aborted: {}", address, e);
                Some(e.to_string())
            }
        };

        let streak = self.fetch_streak(&credential).await;
        let result = tally.into_result(address, streak, failure);
        info!(
            "({}) {} | {} | streak {}",
            result.address,
            result.status,
            result.reward,
            result.streak_label()
        );
        result
    }

    /// Spin, then keep spinning while the hub reports a bonus spin, up to the
    /// per-wallet cap.
    async fn spin_loop(
        &self,
        address: &str,
        engine: &SpinEngine<'_>,
        ledger: &PrizeLedger<'_>,
        credential: &Credential,
        before: &mut PrizeSnapshot,
        tally: &mut SpinTally,
    ) -> Result<()> {
        let max_spins = self.config.spin.max_spins_per_wallet;

        for attempt in 1..=max_spins {
            let outcome = engine.spin_once(credential, before).await?;
            debug!(
                "({}) Spin {}/{} ended: {}",
                address,
                attempt,
                max_spins,
                outcome.as_str()
            );
            let done = matches!(outcome, SpinOutcome::Done { .. });
            tally.record(outcome);
            if !done {
                return Ok(());
            }

            *before = ledger.fetch_all(credential).await;
            if !engine.bonus_spin_available(credential).await {
                return Ok(());
            }
            if attempt == max_spins {
                warn!(
                    "({}) Spin cap of {} reached with spins still available",
                    address, max_spins
                );
            }
        }
        Ok(())
    }

    /// Daily streak from the current-user endpoint; `None` when unavailable
    pub async fn fetch_streak(&self, credential: &Credential) -> Option<u64> {
        let reply = self.hub.current_user(credential.bearer()).await.ok()?;
        if reply.status != 200 {
            return None;
        }
        let body: Value = serde_json::from_str(&reply.body).ok()?;
        streak_from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::chain_client::fixtures::claiming_chain;
    use crate::adapters::chain_client::MockChainClient;
    use crate::adapters::hub_client::mock::{Endpoint, ScriptedHub};
    use serde_json::json;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Collects formatted log lines for the current thread
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
            let sink = self.clone();
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_ansi(false)
                .with_writer(move || sink.clone())
                .finish()
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.spin.receipt_poll_interval_ms = 1;
        config.spin.counter_sync_timeout_secs = 1;
        config.spin.counter_sync_interval_ms = 1;
        config.activation.ready_interval_ms = 1;
        config
    }

    fn voucher() -> Value {
        json!({
            "nonce": 7,
            "expirationTimestamp": 4_000_000_000u64,
            "boost": 0,
            "signature": ["0x01", "0x02", 28]
        })
    }

    fn signed_in_hub() -> ScriptedHub {
        ScriptedHub::new()
            .reply(Endpoint::Nonce, 200, json!({"nonce": "n0nce"}))
            .reply(Endpoint::Verify, 200, json!({"jwt": "bearer"}))
    }

    async fn run(hub: &ScriptedHub, chain: &MockChainClient, config: &AppConfig) -> RunResult {
        let wallet = Wallet::from_private_key(TEST_KEY, config.chain.chain_id).unwrap();
        WalletRunner::new(hub, chain, config).run(&wallet).await
    }

    #[tokio::test]
    async fn auth_failure_is_reported_per_wallet() {
        let hub = ScriptedHub::new().reply_text(Endpoint::Nonce, 502, "bad gateway");
        let chain = MockChainClient::new();

        let result = run(&hub, &chain, &test_config()).await;
        assert_eq!(result.status, RunStatus::AuthError);
        assert_eq!(result.reward, NO_REWARD);
        assert_eq!(result.streak, None);
        assert_eq!(hub.calls(Endpoint::Spin), 0);
    }

    #[tokio::test]
    async fn no_spins_left() {
        let hub = signed_in_hub()
            .reply(Endpoint::Prizes, 200, json!({"data": [], "total": 0}))
            .reply(
                Endpoint::Spin,
                403,
                json!({"message": "You have exhausted your spins"}),
            )
            .reply(Endpoint::UsersMe, 200, json!({"streak": 5}));
        let chain = MockChainClient::new();

        let result = run(&hub, &chain, &test_config()).await;
        assert_eq!(result.status, RunStatus::NoSpins);
        assert_eq!(result.reward, NO_REWARD);
        assert_eq!(result.streak_label(), "5 d.");
    }

    #[tokio::test]
    async fn bonus_spin_rewards_accumulate() {
        let hub = signed_in_hub()
            .reply(Endpoint::Spin, 200, voucher())
            // baseline, sync, bonus check; then the same for the second spin
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 0, "todaySpins": 2}))
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 1, "todaySpins": 1}))
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 1, "todaySpins": 1}))
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 1, "todaySpins": 1}))
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 2, "todaySpins": 0}))
            // initial, after spin 1, refresh, after spin 2 (repeats)
            .reply(Endpoint::Prizes, 200, json!({"data": [], "total": 0}))
            .reply(Endpoint::Prizes, 200, json!({"data": [{"id": 1, "title": "A", "amount": 1}], "total": 1}))
            .reply(Endpoint::Prizes, 200, json!({"data": [{"id": 1, "title": "A", "amount": 1}], "total": 1}))
            .reply(
                Endpoint::Prizes,
                200,
                json!({"data": [{"id": 2, "title": "B", "amount": 2}, {"id": 1, "title": "A", "amount": 1}], "total": 2}),
            )
            .reply(Endpoint::UsersMe, 200, json!({"streak": 3}));
        let chain = claiming_chain(true);

        let result = run(&hub, &chain, &test_config()).await;
        assert_eq!(result.status, RunStatus::Spun);
        assert_eq!(result.reward, "A: 1, B: 2");
        assert_eq!(result.streak, Some(3));
        assert_eq!(hub.calls(Endpoint::Spin), 2);
    }

    #[tokio::test]
    async fn spin_without_new_prize() {
        let hub = signed_in_hub()
            .reply(Endpoint::Spin, 200, voucher())
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 0, "todaySpins": 1}))
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 1, "todaySpins": 0}))
            .reply(Endpoint::Prizes, 200, json!({"data": [], "total": 0}))
            .reply(Endpoint::UsersMe, 200, json!({}));
        let chain = claiming_chain(true);

        let result = run(&hub, &chain, &test_config()).await;
        assert_eq!(result.status, RunStatus::Spun);
        assert_eq!(result.reward, NO_PRIZE);
        assert_eq!(result.streak, Some(0));
    }

    #[tokio::test]
    async fn bonus_loop_is_capped() {
        // counters always report a spin left
        let hub = signed_in_hub()
            .reply(Endpoint::Spin, 200, voucher())
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 0, "todaySpins": 1}))
            .reply(Endpoint::Prizes, 200, json!({"data": [], "total": 0}));
        let chain = claiming_chain(true);
        let mut config = test_config();
        config.spin.max_spins_per_wallet = 2;
        config.spin.counter_sync_timeout_secs = 0;

        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());
        let result = run(&hub, &chain, &config).await;
        assert_eq!(result.status, RunStatus::Spun);
        assert_eq!(hub.calls(Endpoint::Spin), 2);

        let text = logs.text();
        let address = &result.address;
        assert!(text.contains(&format!(
            "({address}) Spin cap of 2 reached with spins still available"
        )));
        assert!(text.contains(&format!("({address}) Spin 1/2 ended: done")));
        assert!(text.contains(&format!("({address}) Spin 2/2 ended: done")));
    }

    #[tokio::test]
    async fn reverted_claim_is_an_error() {
        let hub = signed_in_hub()
            .reply(Endpoint::Spin, 200, voucher())
            .reply(Endpoint::Prizes, 200, json!({"data": [], "total": 0}))
            .reply(Endpoint::UsersMe, 200, json!({"streak": "?"}));
        let chain = claiming_chain(false);

        let result = run(&hub, &chain, &test_config()).await;
        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(result.detail.as_deref(), Some("tx failed"));
        assert_eq!(result.streak_label(), "-");
    }

    #[tokio::test]
    async fn hard_error_after_spin_keeps_rewards() {
        let hub = signed_in_hub()
            .reply(Endpoint::Spin, 200, voucher())
            .transport_error(Endpoint::Spin, "connection reset")
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 0, "todaySpins": 2}))
            .reply(Endpoint::SpinsToday, 200, json!({"plays": 1, "todaySpins": 1}))
            .reply(Endpoint::Prizes, 200, json!({"data": [], "total": 0}))
            .reply(Endpoint::Prizes, 200, json!({"data": [{"title": "LXP", "amount": 50}], "total": 1}))
            .reply(Endpoint::UsersMe, 200, json!({"streak": 1}));
        let chain = claiming_chain(true);

        let result = run(&hub, &chain, &test_config()).await;
        assert_eq!(result.status, RunStatus::CriticalError);
        assert_eq!(result.reward, "LXP: 50");
        assert!(result.detail.unwrap().contains("connection reset"));
    }
}
