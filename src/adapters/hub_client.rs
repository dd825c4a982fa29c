//! HTTP adapter for the sign-in SDK and the rewards hub.
//!
//! Every call returns the raw status and body; deciding what a 403 or a 404
//! means is left to the spin workflow.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::adapters::proxy::ProxyEndpoint;
use crate::config::EndpointConfig;
use crate::error::{HubspinError, Result};

/// Status and body of a hub response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubReply {
    pub status: u16,
    pub body: String,
}

impl HubReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parsed body; `{}` when the body is not JSON
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// First `max` characters of the body, for logs
    pub fn snippet(&self, max: usize) -> String {
        self.body.chars().take(max).collect()
    }

    /// `Network` error unless the status is 2xx
    pub fn require_success(self, what: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HubspinError::Network(format!(
                "{} failed: status={} body={}",
                what,
                self.status,
                self.snippet(200)
            )))
        }
    }
}

/// Body of the signature verification call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub public_wallet_address: String,
    pub message_to_sign: String,
    pub signed_message: String,
    pub chain: String,
    pub network: String,
    pub wallet_name: String,
    pub wallet_provider: String,
}

/// Remote endpoints used by one wallet run
#[async_trait]
pub trait HubApi: Send + Sync {
    async fn fetch_nonce(&self) -> Result<HubReply>;

    async fn verify(&self, request: &VerifyRequest) -> Result<HubReply>;

    async fn activate(&self, bearer: &str) -> Result<HubReply>;

    async fn current_user(&self, bearer: &str) -> Result<HubReply>;

    async fn spins_today(&self, bearer: &str) -> Result<HubReply>;

    async fn request_spin(&self, bearer: &str) -> Result<HubReply>;

    async fn prizes_page(&self, bearer: &str, skip: u32, take: u32) -> Result<HubReply>;
}

/// `reqwest` implementation, one per wallet (each wallet has its own proxy)
#[derive(Clone)]
pub struct HubClient {
    http: Client,
    endpoints: EndpointConfig,
}

impl HubClient {
    pub fn new(endpoints: &EndpointConfig, proxy: Option<&ProxyEndpoint>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_str(&endpoints.origin)
            .map_err(|e| HubspinError::Internal(format!("invalid origin header: {}", e)))?;
        let referer = HeaderValue::from_str(&format!("{}/", endpoints.origin.trim_end_matches('/')))
            .map_err(|e| HubspinError::Internal(format!("invalid referer header: {}", e)))?;
        headers.insert(ORIGIN, origin);
        headers.insert(REFERER, referer);

        let mut builder = Client::builder()
            .user_agent(endpoints.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(endpoints.request_timeout_secs));
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy.reqwest_proxy()?);
        }
        let http = builder
            .build()
            .map_err(|e| HubspinError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints: endpoints.clone(),
        })
    }

    async fn send(&self, what: &str, req: RequestBuilder) -> Result<HubReply> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let reply = HubReply { status, body };
        debug!("{}: {} {}", what, reply.status, reply.snippet(200));
        Ok(reply)
    }

    fn authed(&self, req: RequestBuilder, bearer: &str) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Bearer {}", bearer))
    }
}

#[async_trait]
impl HubApi for HubClient {
    async fn fetch_nonce(&self) -> Result<HubReply> {
        self.send("/nonce", self.http.get(&self.endpoints.nonce_url))
            .await
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<HubReply> {
        self.send("/verify", self.http.post(&self.endpoints.verify_url).json(request))
            .await
    }

    async fn activate(&self, bearer: &str) -> Result<HubReply> {
        let req = self
            .http
            .post(&self.endpoints.activate_url)
            .body(Vec::<u8>::new());
        self.send("/auth", self.authed(req, bearer)).await
    }

    async fn current_user(&self, bearer: &str) -> Result<HubReply> {
        let req = self.http.get(&self.endpoints.users_me_url);
        self.send("/users/me", self.authed(req, bearer)).await
    }

    async fn spins_today(&self, bearer: &str) -> Result<HubReply> {
        let req = self.http.get(&self.endpoints.spins_today_url);
        self.send("/spins/today", self.authed(req, bearer)).await
    }

    async fn request_spin(&self, bearer: &str) -> Result<HubReply> {
        let req = self.http.post(&self.endpoints.spins_url);
        self.send("/spins", self.authed(req, bearer)).await
    }

    async fn prizes_page(&self, bearer: &str, skip: u32, take: u32) -> Result<HubReply> {
        let req = self
            .http
            .get(&self.endpoints.prizes_url)
            .query(&[("skip", skip), ("take", take)]);
        self.send("/prizes/user", self.authed(req, bearer)).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Endpoint {
        Nonce,
        Verify,
        Activate,
        UsersMe,
        SpinsToday,
        Spin,
        Prizes,
    }

    #[derive(Debug, Clone)]
    enum Scripted {
        Reply(HubReply),
        TransportError(String),
    }

    /// Scripted in-memory hub.
    ///
    /// Replies are served per endpoint in the order they were queued; the
    /// last queued reply repeats once the queue is down to one entry.
    /// Unscripted endpoints answer 500.
    #[derive(Default)]
    pub struct ScriptedHub {
        script: Mutex<HashMap<Endpoint, VecDeque<Scripted>>>,
        calls: Mutex<Vec<Endpoint>>,
        verify_requests: Mutex<Vec<VerifyRequest>>,
        prize_queries: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedHub {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, endpoint: Endpoint, status: u16, body: Value) -> Self {
            self.push(endpoint, Scripted::Reply(HubReply::json_body(status, &body)))
        }

        pub fn reply_text(self, endpoint: Endpoint, status: u16, body: &str) -> Self {
            self.push(endpoint, Scripted::Reply(HubReply::new(status, body)))
        }

        pub fn transport_error(self, endpoint: Endpoint, message: &str) -> Self {
            self.push(endpoint, Scripted::TransportError(message.to_string()))
        }

        fn push(self, endpoint: Endpoint, entry: Scripted) -> Self {
            self.script
                .lock()
                .unwrap()
                .entry(endpoint)
                .or_default()
                .push_back(entry);
            self
        }

        pub fn calls(&self, endpoint: Endpoint) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| **c == endpoint)
                .count()
        }

        pub fn verify_requests(&self) -> Vec<VerifyRequest> {
            self.verify_requests.lock().unwrap().clone()
        }

        pub fn prize_queries(&self) -> Vec<(u32, u32)> {
            self.prize_queries.lock().unwrap().clone()
        }

        fn next(&self, endpoint: Endpoint) -> Result<HubReply> {
            self.calls.lock().unwrap().push(endpoint);
            let mut script = self.script.lock().unwrap();
            let entry = match script.get_mut(&endpoint) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            match entry {
                Some(Scripted::Reply(reply)) => Ok(reply),
                Some(Scripted::TransportError(msg)) => Err(HubspinError::Network(msg)),
                None => Ok(HubReply::new(500, "unscripted")),
            }
        }
    }

    #[async_trait]
    impl HubApi for ScriptedHub {
        async fn fetch_nonce(&self) -> Result<HubReply> {
            self.next(Endpoint::Nonce)
        }

        async fn verify(&self, request: &VerifyRequest) -> Result<HubReply> {
            self.verify_requests.lock().unwrap().push(request.clone());
            self.next(Endpoint::Verify)
        }

        async fn activate(&self, _bearer: &str) -> Result<HubReply> {
            self.next(Endpoint::Activate)
        }

        async fn current_user(&self, _bearer: &str) -> Result<HubReply> {
            self.next(Endpoint::UsersMe)
        }

        async fn spins_today(&self, _bearer: &str) -> Result<HubReply> {
            self.next(Endpoint::SpinsToday)
        }

        async fn request_spin(&self, _bearer: &str) -> Result<HubReply> {
            self.next(Endpoint::Spin)
        }

        async fn prizes_page(&self, _bearer: &str, skip: u32, take: u32) -> Result<HubReply> {
            self.prize_queries.lock().unwrap().push((skip, take));
            self.next(Endpoint::Prizes)
        }
    }
}
