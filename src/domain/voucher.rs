use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::fields::as_u64_lenient;
use crate::error::{HubspinError, Result};
use crate::signing::signature::{self, VoucherSignature};

/// Server-issued, single-use authorization for one `participate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinVoucher {
    pub nonce: u64,
    pub expiration_timestamp: u64,
    pub boost: u64,
    pub signature: VoucherSignature,
}

impl SpinVoucher {
    /// Decode the body of a successful spin request.
    ///
    /// `boost` defaults to 0 when absent.
    pub fn from_json(body: &Value) -> Result<Self> {
        let nonce = required_u64(body, "nonce")?;
        let expiration_timestamp = required_u64(body, "expirationTimestamp")?;
        let boost = match body.get("boost") {
            None | Some(Value::Null) => 0,
            Some(raw) => as_u64_lenient(raw).ok_or_else(|| {
                HubspinError::MalformedVoucher(format!("boost is not an unsigned integer: {raw}"))
            })?,
        };
        let raw_signature = body
            .get("signature")
            .ok_or_else(|| HubspinError::MalformedVoucher("missing signature".to_string()))?;

        Ok(Self {
            nonce,
            expiration_timestamp,
            boost,
            signature: signature::normalize(raw_signature)?,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let now = now.timestamp();
        now >= 0 && self.expiration_timestamp <= now as u64
    }
}

fn required_u64(body: &Value, field: &str) -> Result<u64> {
    let raw = body
        .get(field)
        .ok_or_else(|| HubspinError::MalformedVoucher(format!("missing {field}")))?;
    as_u64_lenient(raw).ok_or_else(|| {
        HubspinError::MalformedVoucher(format!("{field} is not an unsigned integer: {raw}"))
    })
}
