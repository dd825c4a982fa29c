//! On-chain side of a spin: the `participate` claim call.

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::sol;
use alloy::transports::http::{reqwest as rpc_reqwest, Http};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::adapters::proxy::ProxyEndpoint;
use crate::config::ChainConfig;
use crate::domain::SpinVoucher;
use crate::error::{HubspinError, Result};
use crate::signing::{VoucherSignature, Wallet};

// Generate contract bindings for the spin game
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface ISpinGame {
        struct Signature {
            bytes32 r;
            bytes32 s;
            uint8 v;
        }

        /// Claim one spin with a hub-issued voucher
        function participate(
            uint64 _nonce,
            uint256 _expirationTimestamp,
            uint64 _boost,
            Signature calldata _signature
        ) external;
    }
}

/// Arguments of one `participate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCall {
    pub nonce: u64,
    pub expiration_timestamp: u64,
    pub boost: u64,
    pub signature: VoucherSignature,
}

impl From<&SpinVoucher> for ClaimCall {
    fn from(voucher: &SpinVoucher) -> Self {
        Self {
            nonce: voucher.nonce,
            expiration_timestamp: voucher.expiration_timestamp,
            boost: voucher.boost,
            signature: voucher.signature,
        }
    }
}

/// Explicit transaction parameters; nothing is left to provider fillers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub gas_limit: u64,
    pub gas_price: u128,
    /// Account sequence number
    pub nonce: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: B256,
    pub success: bool,
    pub gas_used: u64,
}

/// Chain access for one wallet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn gas_price(&self) -> Result<u128>;

    async fn balance(&self) -> Result<U256>;

    async fn transaction_count(&self) -> Result<u64>;

    async fn estimate_claim_gas(&self, call: &ClaimCall) -> Result<u64>;

    /// Sign and broadcast; returns the transaction hash
    async fn send_claim(&self, call: &ClaimCall, params: TxParams) -> Result<B256>;

    /// `None` while the transaction is not yet mined
    async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptSummary>>;
}

/// Poll for a receipt until `timeout`. Lookup errors are retried; running
/// out of time is a hard `ConfirmationTimeout`.
pub async fn wait_for_receipt(
    chain: &dyn ChainClient,
    tx_hash: B256,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ReceiptSummary> {
    let wait = async {
        loop {
            match chain.receipt(tx_hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => debug!("Receipt lookup for {} failed: {}", tx_hash, e),
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| HubspinError::ConfirmationTimeout {
            tx_hash: format!("{:?}", tx_hash),
            timeout_secs: timeout.as_secs(),
        })
}

/// JSON-RPC implementation over alloy, routed through the wallet's proxy
pub struct AlloyChainClient {
    provider: DynProvider,
    contract: Address,
    from: Address,
}

impl AlloyChainClient {
    pub fn new(chain: &ChainConfig, wallet: &Wallet, proxy: Option<&ProxyEndpoint>) -> Result<Self> {
        let rpc_url: url::Url = chain
            .rpc_url
            .parse()
            .map_err(|e| HubspinError::Rpc(format!("Invalid RPC URL: {}", e)))?;
        let contract: Address = chain.contract_address.parse().map_err(|e| {
            HubspinError::Internal(format!("Invalid contract address: {}", e))
        })?;

        let mut http = rpc_reqwest::Client::builder();
        if let Some(proxy) = proxy {
            let rpc_proxy = rpc_reqwest::Proxy::all(proxy.url())
                .map_err(|e| HubspinError::Proxy(format!("invalid RPC proxy: {}", e)))?;
            http = http.proxy(rpc_proxy);
        }
        let http = http
            .build()
            .map_err(|e| HubspinError::Internal(format!("failed to build RPC client: {}", e)))?;

        let client = RpcClient::new(Http::with_client(http, rpc_url), false);
        let provider = ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_client(client)
            .erased();

        Ok(Self {
            provider,
            contract,
            from: wallet.address(),
        })
    }

    fn signature(call: &ClaimCall) -> ISpinGame::Signature {
        ISpinGame::Signature {
            r: call.signature.r,
            s: call.signature.s,
            v: call.signature.v,
        }
    }
}

fn rpc_err(what: &str) -> impl Fn(alloy::transports::TransportError) -> HubspinError + '_ {
    move |e| HubspinError::Rpc(format!("{}: {}", what, e))
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(rpc_err("eth_gasPrice"))
    }

    async fn balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.from)
            .await
            .map_err(rpc_err("eth_getBalance"))
    }

    async fn transaction_count(&self) -> Result<u64> {
        self.provider
            .get_transaction_count(self.from)
            .await
            .map_err(rpc_err("eth_getTransactionCount"))
    }

    async fn estimate_claim_gas(&self, call: &ClaimCall) -> Result<u64> {
        let contract = ISpinGame::new(self.contract, &self.provider);
        contract
            .participate(
                call.nonce,
                U256::from(call.expiration_timestamp),
                call.boost,
                Self::signature(call),
            )
            .from(self.from)
            .estimate_gas()
            .await
            .map_err(|e| HubspinError::Rpc(format!("gas estimation failed: {}", e)))
    }

    async fn send_claim(&self, call: &ClaimCall, params: TxParams) -> Result<B256> {
        let contract = ISpinGame::new(self.contract, &self.provider);
        let pending = contract
            .participate(
                call.nonce,
                U256::from(call.expiration_timestamp),
                call.boost,
                Self::signature(call),
            )
            .from(self.from)
            .gas(params.gas_limit)
            .gas_price(params.gas_price)
            .nonce(params.nonce)
            .send()
            .await
            .map_err(|e| HubspinError::Rpc(format!("claim tx submission failed: {}", e)))?;

        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptSummary>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(rpc_err("eth_getTransactionReceipt"))?;

        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash,
            success: r.status(),
            gas_used: r.gas_used(),
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_for_receipt_polls_until_mined() {
        let mut chain = MockChainClient::new();
        let hash = B256::repeat_byte(0x11);
        let mut seq = mockall::Sequence::new();
        chain
            .expect_receipt()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        chain
            .expect_receipt()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |h| {
                Ok(Some(ReceiptSummary {
                    tx_hash: h,
                    success: true,
                    gas_used: 90_000,
                }))
            });

        let receipt = wait_for_receipt(
            &chain,
            hash,
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.tx_hash, hash);
    }

    #[tokio::test]
    async fn wait_for_receipt_times_out_hard() {
        let mut chain = MockChainClient::new();
        chain.expect_receipt().returning(|_| Ok(None));

        let err = wait_for_receipt(
            &chain,
            B256::ZERO,
            Duration::from_millis(20),
            Duration::from_millis(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HubspinError::ConfirmationTimeout { .. }));
    }
}
