use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use zeroize::Zeroize;

use crate::domain::fields::{as_i64_lenient, as_u64_lenient};

/// Bearer credential issued by the sign-in handshake.
///
/// One per wallet run, never refreshed.
#[derive(Clone)]
pub struct Credential {
    bearer: String,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(bearer: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            bearer: bearer.into(),
            issued_at,
        }
    }

    pub fn bearer(&self) -> &str {
        &self.bearer
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.bearer.zeroize();
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("bearer", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// `/spins/today` counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpinCounters {
    /// Spins played so far
    pub plays: Option<i64>,
    /// Spins still available today
    pub today_spins: Option<i64>,
}

impl SpinCounters {
    pub fn from_json(body: &Value) -> Self {
        Self {
            plays: body.get("plays").and_then(as_i64_lenient),
            today_spins: body.get("todaySpins").and_then(as_i64_lenient),
        }
    }

    /// Plays went up or remaining spins went down relative to `baseline`.
    pub fn advanced_from(&self, baseline: &SpinCounters) -> bool {
        let played_more = matches!((baseline.plays, self.plays), (Some(a), Some(b)) if b > a);
        let fewer_left =
            matches!((baseline.today_spins, self.today_spins), (Some(a), Some(b)) if b < a);
        played_more || fewer_left
    }

    pub fn has_spin_left(&self) -> bool {
        self.today_spins.unwrap_or(0) > 0
    }
}

/// Result of one spin attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinOutcome {
    /// Claim confirmed on chain; carries the display strings of new rewards
    Done {
        tx_hash: String,
        rewards: Vec<String>,
    },
    NoSpins,
    NotActivated,
    Error { reason: String },
}

impl SpinOutcome {
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done { .. } => "done",
            Self::NoSpins => "no_spins",
            Self::NotActivated => "not_activated",
            Self::Error { .. } => "error",
        }
    }
}

/// Final per-wallet status shown in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Spun,
    NoSpins,
    NotActivated,
    Error,
    AuthError,
    ProxyError,
    CriticalError,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spun => "Spun",
            Self::NoSpins => "No spins",
            Self::NotActivated => "Not activated",
            Self::Error => "Error",
            Self::AuthError => "Auth error",
            Self::ProxyError => "Proxy error",
            Self::CriticalError => "Critical error",
        }
    }

    /// Status of a wallet whose last attempt ended with `outcome` and that never
    /// completed a spin.
    pub fn from_last_outcome(outcome: &SpinOutcome) -> Self {
        match outcome {
            SpinOutcome::Done { .. } => Self::Spun,
            SpinOutcome::NoSpins => Self::NoSpins,
            SpinOutcome::NotActivated => Self::NotActivated,
            SpinOutcome::Error { .. } => Self::Error,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub const NO_REWARD: &str = "—";
pub const NO_PRIZE: &str = "No prize";

/// Terminal record for one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub address: String,
    pub streak: Option<u64>,
    pub status: RunStatus,
    pub reward: String,
    /// Why the run ended, when it did not end with a spin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RunResult {
    pub fn failed(address: impl Into<String>, status: RunStatus, detail: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            streak: None,
            status,
            reward: NO_REWARD.to_string(),
            detail: Some(detail.into()),
        }
    }

    pub fn streak_label(&self) -> String {
        match self.streak {
            Some(days) => format!("{days} d."),
            None => "-".to_string(),
        }
    }
}

/// Streak counter from a `/users/me` body
pub fn streak_from_json(body: &Value) -> Option<u64> {
    match body.get("streak") {
        None => Some(0),
        Some(raw) => as_u64_lenient(raw),
    }
}
