//! Webhook signature verification.
//!
//! Stripe signs each webhook delivery with HMAC-SHA256 over
//! `"{timestamp}.{raw_body}"` and sends the result in the
//! `Stripe-Signature` header. Verification validates the timestamp window
//! first (replay protection), then compares signatures in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted event age (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Tolerance for events timestamped in the future (clock skew).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the `Stripe-Signature` header.
///
/// Format: `t=<timestamp>,v1=<signature>[,v0=<legacy>]`. Unknown fields are
/// ignored for forward compatibility.
#[derive(Debug, Clone)]
pub(crate) struct SignatureHeader {
    /// Unix timestamp the provider generated the signature at.
    pub timestamp: i64,

    /// Primary v1 signature (HMAC-SHA256, decoded from hex).
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub(crate) fn parse(header: &str) -> Result<Self, GatewayError> {
        if header.is_empty() {
            return Err(GatewayError::Parse("empty signature header".to_string()));
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                GatewayError::Parse("malformed signature header".to_string())
            })?;

            match key.trim() {
                "t" => {
                    timestamp = Some(value.trim().parse().map_err(|_| {
                        GatewayError::Parse("invalid signature timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex_decode(value.trim()).ok_or_else(|| {
                        GatewayError::Parse("signature is not valid hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp
                .ok_or_else(|| GatewayError::Parse("missing timestamp".to_string()))?,
            v1_signature: v1_signature
                .ok_or_else(|| GatewayError::Parse("missing v1 signature".to_string()))?,
        })
    }
}

/// Verify a raw webhook payload against a parsed signature header.
pub(crate) fn verify(
    secret: &str,
    payload: &[u8],
    header: &SignatureHeader,
) -> Result<(), GatewayError> {
    let now = chrono::Utc::now().timestamp();
    let age = now - header.timestamp;

    if age > MAX_EVENT_AGE_SECS {
        return Err(GatewayError::TimestampExpired);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(GatewayError::TimestampInFuture);
    }

    let expected = compute_signature(secret, header.timestamp, payload);
    if !constant_time_compare(&expected, &header.v1_signature) {
        return Err(GatewayError::InvalidSignature);
    }

    Ok(())
}

/// HMAC-SHA256 over `"{timestamp}.{payload}"`.
pub(crate) fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Decode a hex string to bytes.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        bytes.push(u8::from_str_radix(&hex[i..i + 2], 16).ok()?);
    }
    Some(bytes)
}

/// Encode bytes to a lowercase hex string.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";

    fn signed_header(secret: &str, timestamp: i64, payload: &str) -> String {
        let signature = compute_signature(secret, timestamp, payload.as_bytes());
        format!("t={},v1={}", timestamp, hex_encode(&signature))
    }

    // ══════════════════════════════════════════════════════════════
    // Header Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_v1() {
        let header_str = format!("t=1234567890,v1={}", "a".repeat(64));
        let header = SignatureHeader::parse(&header_str).unwrap();
        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signature.len(), 32);
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let header_str = format!("t=1234567890,v1={},v0={},scheme=hmac", "a".repeat(64), "b".repeat(64));
        let header = SignatureHeader::parse(&header_str).unwrap();
        assert_eq!(header.timestamp, 1234567890);
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(GatewayError::Parse(_))));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(GatewayError::Parse(_))));
    }

    #[test]
    fn parse_header_invalid_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("t=soon,v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(GatewayError::Parse(_))));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=not_hex");
        assert!(matches!(result, Err(GatewayError::Parse(_))));
    }

    #[test]
    fn parse_header_empty_fails() {
        let result = SignatureHeader::parse("");
        assert!(matches!(result, Err(GatewayError::Parse(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_verifies() {
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let header = SignatureHeader::parse(&signed_header(TEST_SECRET, timestamp, payload)).unwrap();

        assert!(verify(TEST_SECRET, payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let header = SignatureHeader::parse(&signed_header("whsec_other", timestamp, payload)).unwrap();

        let result = verify(TEST_SECRET, payload.as_bytes(), &header);
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));
    }

    #[test]
    fn tampered_payload_fails() {
        let timestamp = chrono::Utc::now().timestamp();
        let header =
            SignatureHeader::parse(&signed_header(TEST_SECRET, timestamp, r#"{"id":"evt_1"}"#))
                .unwrap();

        let result = verify(TEST_SECRET, br#"{"id":"evt_2"}"#, &header);
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));
    }

    #[test]
    fn expired_timestamp_fails() {
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() - 301;
        let header = SignatureHeader::parse(&signed_header(TEST_SECRET, timestamp, payload)).unwrap();

        let result = verify(TEST_SECRET, payload.as_bytes(), &header);
        assert!(matches!(result, Err(GatewayError::TimestampExpired)));
    }

    #[test]
    fn timestamp_at_window_boundary_verifies() {
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() - 299;
        let header = SignatureHeader::parse(&signed_header(TEST_SECRET, timestamp, payload)).unwrap();

        assert!(verify(TEST_SECRET, payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn future_timestamp_beyond_skew_fails() {
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() + 120;
        let header = SignatureHeader::parse(&signed_header(TEST_SECRET, timestamp, payload)).unwrap();

        let result = verify(TEST_SECRET, payload.as_bytes(), &header);
        assert!(matches!(result, Err(GatewayError::TimestampInFuture)));
    }

    #[test]
    fn small_future_skew_is_tolerated() {
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() + 30;
        let header = SignatureHeader::parse(&signed_header(TEST_SECRET, timestamp, payload)).unwrap();

        assert!(verify(TEST_SECRET, payload.as_bytes(), &header).is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Hex Helpers
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn hex_roundtrip() {
        let bytes = vec![0x00, 0x1f, 0xab, 0xff];
        assert_eq!(hex_decode(&hex_encode(&bytes)), Some(bytes));
    }

    #[test]
    fn hex_decode_rejects_odd_length() {
        assert_eq!(hex_decode("abc"), None);
    }

    #[test]
    fn hex_decode_rejects_non_hex() {
        assert_eq!(hex_decode("zz"), None);
    }
}
