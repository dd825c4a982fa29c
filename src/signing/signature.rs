//! Voucher signature normalization.
//!
//! The hub returns the voucher signature either as `{r, s, v}` or as an
//! ordered `[r, s, v]` triple. The contract wants two zero-padded `bytes32`
//! scalars and a legacy (27/28) recovery byte.

use alloy::primitives::B256;
use serde_json::Value;

use crate::domain::fields::as_u64_lenient;
use crate::error::{HubspinError, Result};

/// Signature in the form the `participate` call expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl VoucherSignature {
    pub fn r_hex(&self) -> String {
        format!("0x{}", hex::encode(self.r))
    }

    pub fn s_hex(&self) -> String {
        format!("0x{}", hex::encode(self.s))
    }
}

/// Normalize a raw signature payload (`{r,s,v}` or `[r,s,v]`).
pub fn normalize(raw: &Value) -> Result<VoucherSignature> {
    let (r, s, v) = match raw {
        Value::Object(map) => (
            map.get("r").ok_or_else(|| missing("r"))?,
            map.get("s").ok_or_else(|| missing("s"))?,
            map.get("v").ok_or_else(|| missing("v"))?,
        ),
        Value::Array(items) if items.len() >= 3 => (&items[0], &items[1], &items[2]),
        other => {
            return Err(HubspinError::MalformedSignature(format!(
                "unknown signature shape: {}",
                other
            )))
        }
    };

    Ok(VoucherSignature {
        r: scalar32(r, "r")?,
        s: scalar32(s, "s")?,
        v: recovery_byte(v)?,
    })
}

/// Left-pad a hex scalar of up to 32 bytes to exactly 32 bytes.
pub fn pad_hex32(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() > 64 {
        return Err(HubspinError::MalformedSignature(format!(
            "scalar longer than 32 bytes ({} hex digits)",
            digits.len()
        )));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HubspinError::MalformedSignature(format!(
            "scalar is not hex: {raw}"
        )));
    }
    Ok(format!("0x{:0>64}", digits.to_ascii_lowercase()))
}

/// Map a recovery id to the legacy 27/28 form.
pub fn recovery_byte(raw: &Value) -> Result<u8> {
    let v = as_u64_lenient(raw).ok_or_else(|| {
        HubspinError::MalformedSignature(format!("v is not an integer: {raw}"))
    })?;
    match v {
        0 | 1 => Ok(v as u8 + 27),
        27 | 28 => Ok(v as u8),
        other => Err(HubspinError::MalformedSignature(format!(
            "v out of range: {other}"
        ))),
    }
}

fn scalar32(raw: &Value, name: &str) -> Result<B256> {
    let text = raw.as_str().ok_or_else(|| {
        HubspinError::MalformedSignature(format!("{name} must be a hex string, got {raw}"))
    })?;
    let padded = pad_hex32(text)?;
    padded
        .parse::<B256>()
        .map_err(|e| HubspinError::MalformedSignature(format!("{name}: {e}")))
}

fn missing(field: &str) -> HubspinError {
    HubspinError::MalformedSignature(format!("missing field {field}"))
}
