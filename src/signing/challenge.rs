//! Sign-in-with-Ethereum challenge text.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::AuthConfig;

/// ISO-8601 UTC timestamp with millisecond precision and a `Z` suffix
pub fn issued_at_string(issued_at: DateTime<Utc>) -> String {
    issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the sign-in message. The server verifies the exact bytes, so every
/// line break and label here is load-bearing.
pub fn build_challenge_message(
    auth: &AuthConfig,
    address: &str,
    nonce: &str,
    issued_at: DateTime<Utc>,
) -> String {
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         {address}\n\
         \n\
         {statement}\n\
         \n\
         URI: {uri}\n\
         Version: 1\n\
         Chain ID: {chain_id}\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}\n\
         Request ID: {request_id}",
        domain = auth.domain,
        statement = auth.statement,
        uri = auth.uri,
        chain_id = auth.chain_id,
        issued_at = issued_at_string(issued_at),
        request_id = auth.request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_has_millis_and_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2024, 9, 1, 12, 30, 5).unwrap();
        assert_eq!(issued_at_string(ts), "2024-09-01T12:30:05.000Z");
    }

    #[test]
    fn message_matches_template() {
        let auth = AuthConfig::default();
        let ts = Utc.with_ymd_and_hms(2024, 9, 1, 12, 30, 5).unwrap();
        let msg = build_challenge_message(&auth, "0xAbC", "n0nce", ts);

        let expected = format!(
            "linea.build wants you to sign in with your Ethereum account:\n0xAbC\n\n{}\n\n\
             URI: https://linea.build/hub/rewards\nVersion: 1\nChain ID: 1\nNonce: n0nce\n\
             Issued At: 2024-09-01T12:30:05.000Z\n\
             Request ID: ae98b9b4-daaf-4bb3-b5e0-3f07175906ed",
            auth.statement
        );
        assert_eq!(msg, expected);
    }

    #[test]
    fn statement_is_a_single_line() {
        let auth = AuthConfig::default();
        assert!(!auth.statement.contains('\n'));
        assert!(!auth.statement.contains("  "));
        assert!(auth.statement.starts_with("Welcome to Linea Hub. Signing is"));
    }
}
