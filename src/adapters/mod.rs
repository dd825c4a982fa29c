pub mod chain_client;
pub mod hub_client;
pub mod proxy;

pub use chain_client::{
    wait_for_receipt, AlloyChainClient, ChainClient, ClaimCall, ReceiptSummary, TxParams,
};
pub use hub_client::{HubApi, HubClient, HubReply, VerifyRequest};
pub use proxy::{ProxyEndpoint, ProxyProbe};
