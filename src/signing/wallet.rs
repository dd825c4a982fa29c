use crate::error::{HubspinError, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use tracing::debug;
use zeroize::Zeroize;

/// Wallet for signing sign-in challenges and claim transactions
///
/// # Security
/// The private key string is zeroized right after parsing; only the signer
/// keeps the key material.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a private key hex string (with or without `0x`)
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let mut secure_key = private_key.trim().trim_start_matches("0x").to_string();

        let parsed = secure_key.parse::<PrivateKeySigner>();
        secure_key.zeroize();

        let signer = parsed
            .map_err(|e| HubspinError::Wallet(format!("Invalid private key: {}", e)))?
            .with_chain_id(Some(chain_id));

        debug!("Wallet initialized: {}", signer.address());

        Ok(Self { signer, chain_id })
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Checksummed address, as the hub expects it in the challenge
    pub fn checksum_address(&self) -> String {
        self.address().to_checksum(None)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a message with the personal-message (EIP-191) prefix, returning
    /// the 65-byte `0x` hex signature
    pub async fn sign_personal_message(&self, message: &str) -> Result<String> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| HubspinError::Signature(format!("Failed to sign message: {}", e)))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    /// Transaction signer for an alloy provider
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known anvil development key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::from_private_key(TEST_KEY, 59144).unwrap();

        assert_eq!(wallet.chain_id(), 59144);
        assert_eq!(
            wallet.checksum_address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let err = Wallet::from_private_key("not-a-key", 1).unwrap_err();
        assert!(matches!(err, HubspinError::Wallet(_)));
    }

    #[tokio::test]
    async fn test_personal_signature_shape() {
        let wallet = Wallet::from_private_key(TEST_KEY, 1).unwrap();
        let sig = wallet.sign_personal_message("hello").await.unwrap();

        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 2 + 130);
        assert!(sig.ends_with("1b") || sig.ends_with("1c"));
    }
}
