use thiserror::Error;

/// Main error type for the spin claimer
#[derive(Error, Debug)]
pub enum HubspinError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Authentication errors
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // Voucher decoding errors
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Malformed voucher: {0}")]
    MalformedVoucher(String),

    // On-chain errors
    #[error("Insufficient funds: balance {balance} wei, need ~{required} wei")]
    InsufficientFunds { required: String, balance: String },

    /// Mined with a failure status
    #[error("tx failed")]
    TransactionFailed { tx_hash: String },

    #[error("Receipt for {tx_hash} not observed within {timeout_secs}s")]
    ConfirmationTimeout { tx_hash: String, timeout_secs: u64 },

    #[error("RPC error: {0}")]
    Rpc(String),

    // Crypto/signing errors
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Signature error: {0}")]
    Signature(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for HubspinError
pub type Result<T> = std::result::Result<T, HubspinError>;

impl HubspinError {
    /// Whether the error came from the transport layer rather than from the
    /// payload or the chain.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Network(_) | Self::Proxy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_message_names_both_amounts() {
        let err = HubspinError::InsufficientFunds {
            required: "1150000".to_string(),
            balance: "1149999".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("1150000"));
        assert!(text.contains("1149999"));
    }

    #[test]
    fn network_classification() {
        assert!(HubspinError::Network("503".into()).is_network());
        assert!(HubspinError::Proxy("refused".into()).is_network());
        assert!(!HubspinError::AuthFailed("no jwt".into()).is_network());
    }
}
