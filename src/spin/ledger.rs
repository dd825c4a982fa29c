//! Reward history snapshots and identity-set diffs.

use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::HubApi;
use crate::config::PrizeConfig;
use crate::domain::fields::as_u64_lenient;
use crate::domain::{Credential, Prize, PrizeSnapshot};

pub struct PrizeLedger<'a> {
    hub: &'a dyn HubApi,
    config: &'a PrizeConfig,
}

impl<'a> PrizeLedger<'a> {
    pub fn new(hub: &'a dyn HubApi, config: &'a PrizeConfig) -> Self {
        Self { hub, config }
    }

    /// Page through the reward history with `skip`/`take`.
    ///
    /// Stops at the server-reported total, on an empty page, or after
    /// `max_pages`. A failed page counts as an empty one.
    pub async fn fetch_all(&self, credential: &Credential) -> PrizeSnapshot {
        let take = self.config.page_size;
        let mut items = Vec::new();
        let mut skip = 0u32;

        for _ in 0..self.config.max_pages {
            let (page, total) = self.fetch_page(credential, skip, take).await;
            let page_empty = page.is_empty();
            items.extend(page.into_iter().map(Prize::from_json));
            skip = skip.saturating_add(take);

            if items.len() as u64 >= total || page_empty {
                return PrizeSnapshot::new(items, total);
            }
        }

        warn!(
            "Prize pagination stopped after {} pages ({} items)",
            self.config.max_pages,
            items.len()
        );
        let total = items.len() as u64;
        PrizeSnapshot::new(items, total)
    }

    async fn fetch_page(&self, credential: &Credential, skip: u32, take: u32) -> (Vec<Value>, u64) {
        let reply = match self.hub.prizes_page(credential.bearer(), skip, take).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("/prizes/user (skip={}, take={}) failed: {}", skip, take, e);
                return (Vec::new(), 0);
            }
        };

        let body = reply.json();
        let data = body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();
        let total = body.get("total").and_then(as_u64_lenient).unwrap_or(0);
        debug!(
            "/prizes/user: {} (skip={}, take={}) size={}, total={}",
            reply.status,
            skip,
            take,
            data.len(),
            total
        );

        if reply.status != 200 {
            return (Vec::new(), 0);
        }
        (data, total)
    }
}

/// Prizes in `after` whose identity is not in `before`, keeping `after` order
pub fn diff(before: &PrizeSnapshot, after: &PrizeSnapshot) -> Vec<Prize> {
    before.new_since(after).into_iter().cloned().collect()
}
