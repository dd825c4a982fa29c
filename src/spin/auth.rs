//! Sign-in handshake and account activation.
//!
//! nonce → challenge → personal signature → verify → bearer credential.
//! Activation is only attempted when the hub reports the account as unknown.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::adapters::{HubApi, VerifyRequest};
use crate::config::{ActivationConfig, AuthConfig};
use crate::domain::fields::pick_text;
use crate::domain::Credential;
use crate::error::{HubspinError, Result};
use crate::signing::{build_challenge_message, Wallet};

/// Bearer token aliases in the verify response, in priority order
const BEARER_FIELDS: &[&str] = &["jwt", "token", "minifiedJwt"];

pub struct AuthSession<'a> {
    hub: &'a dyn HubApi,
    auth: &'a AuthConfig,
    activation: &'a ActivationConfig,
}

impl<'a> AuthSession<'a> {
    pub fn new(hub: &'a dyn HubApi, auth: &'a AuthConfig, activation: &'a ActivationConfig) -> Self {
        Self {
            hub,
            auth,
            activation,
        }
    }

    pub async fn obtain_nonce(&self) -> Result<String> {
        let reply = self.hub.fetch_nonce().await?.require_success("/nonce")?;
        let body = reply.json();
        debug!("/nonce: {}", reply.snippet(200));
        pick_text(&body, &["nonce"])
            .ok_or_else(|| HubspinError::AuthFailed("nonce response has no nonce".to_string()))
    }

    /// Run the full handshake and return the bearer credential
    pub async fn sign_and_verify(&self, wallet: &Wallet) -> Result<Credential> {
        let address = wallet.checksum_address();
        let nonce = self.obtain_nonce().await?;
        let issued_at = Utc::now();
        let message = build_challenge_message(self.auth, &address, &nonce, issued_at);
        let signed_message = wallet.sign_personal_message(&message).await?;

        let request = VerifyRequest {
            public_wallet_address: address.clone(),
            message_to_sign: message,
            signed_message,
            chain: "EVM".to_string(),
            network: self.auth.chain_id.to_string(),
            wallet_name: self.auth.wallet_name.clone(),
            wallet_provider: self.auth.wallet_provider.clone(),
        };

        let reply = self.hub.verify(&request).await?;
        info!("({}) /verify: {}", address, reply.status);
        let body = reply.require_success("/verify")?.json();

        let bearer = pick_text(&body, BEARER_FIELDS).ok_or_else(|| {
            HubspinError::AuthFailed("verify response has no jwt/token/minifiedJwt".to_string())
        })?;
        info!("({}) Bearer token ready", address);
        Ok(Credential::new(bearer, issued_at))
    }

    /// POST the activation endpoint; any 2xx counts as success
    pub async fn activate(&self, credential: &Credential) -> Result<bool> {
        let reply = self.hub.activate(credential.bearer()).await?;
        info!("/auth: {} {}", reply.status, reply.snippet(200));
        Ok(reply.is_success())
    }

    /// Poll the current-user endpoint a fixed number of times at a fixed interval
    pub async fn await_ready(&self, credential: &Credential) -> bool {
        let attempts = self.activation.ready_attempts.max(1);
        for attempt in 1..=attempts {
            match self.hub.current_user(credential.bearer()).await {
                Ok(reply) if reply.status == 200 => return true,
                Ok(reply) => debug!("/users/me: {} {}", reply.status, reply.snippet(160)),
                Err(e) => debug!("/users/me failed: {}", e),
            }
            if attempt < attempts {
                tokio::time::sleep(self.activation.ready_interval()).await;
            }
        }
        false
    }

    /// Activation followed by the readiness poll
    pub async fn activate_and_wait(&self, credential: &Credential) -> bool {
        match self.activate(credential).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("Activation request failed: {}", e);
                return false;
            }
        }
        if !self.await_ready(credential).await {
            return false;
        }
        info!("Account activated automatically");
        true
    }
}
