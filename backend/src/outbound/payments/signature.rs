//! Webhook signature verification.
//!
//! The header has the form `t=<unix seconds>,v1=<hex digest>[,v1=...]`. The
//! digest is HMAC-SHA256 over `"{t}.{raw body}"` keyed with the webhook
//! secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::dto::parse_event;
use crate::domain::PaymentEvent;
use crate::domain::ports::PaymentGatewayError;
pub use crate::domain::ports::SIGNATURE_HEADER;

pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<HmacSha256, PaymentGatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| PaymentGatewayError::invalid_signature(err.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Signature header value for `payload` at `timestamp`.
///
/// # Examples
/// ```
/// use tourbook::outbound::payments::sign_payload;
///
/// let header = sign_payload("whsec_test", 1_700_000_000, b"{}")?;
/// assert!(header.starts_with("t=1700000000,v1="));
/// # Ok::<(), tourbook::domain::ports::PaymentGatewayError>(())
/// ```
pub fn sign_payload(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, PaymentGatewayError> {
    let digest = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
}

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader, PaymentGatewayError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }
    let timestamp = timestamp
        .ok_or_else(|| PaymentGatewayError::invalid_signature("missing signature timestamp"))?;
    if signatures.is_empty() {
        return Err(PaymentGatewayError::invalid_signature(
            "no v1 signature present",
        ));
    }
    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

/// Check the signature and decode the event it covers.
pub fn verify_event(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: DateTime<Utc>,
    tolerance_seconds: i64,
) -> Result<PaymentEvent, PaymentGatewayError> {
    let parsed = parse_header(header)?;
    if now.timestamp().abs_diff(parsed.timestamp) > tolerance_seconds.unsigned_abs() {
        return Err(PaymentGatewayError::invalid_signature(
            "signature timestamp outside tolerance",
        ));
    }
    let mac = mac_for(secret, parsed.timestamp, payload)?;
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if !matched {
        return Err(PaymentGatewayError::invalid_signature(
            "no signature matches the payload",
        ));
    }
    parse_event(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_now;
    use chrono::TimeDelta;
    use rstest::rstest;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &[u8] = br#"{"type":"invoice.paid","data":{"object":{}}}"#;

    #[rstest]
    fn valid_signatures_decode_the_event() {
        let header = sign_payload(SECRET, fixture_now().timestamp(), PAYLOAD).expect("sign");
        let event = verify_event(SECRET, PAYLOAD, &header, fixture_now(), 300).expect("event");
        assert_eq!(
            event,
            PaymentEvent::Ignored {
                kind: "invoice.paid".to_owned()
            }
        );
    }

    #[rstest]
    fn any_matching_v1_entry_is_accepted() {
        let signed = sign_payload(SECRET, fixture_now().timestamp(), PAYLOAD).expect("sign");
        let digest = signed.split("v1=").nth(1).expect("digest");
        let header = format!("t={},v1=00ff,v1={digest}", fixture_now().timestamp());
        assert!(verify_event(SECRET, PAYLOAD, &header, fixture_now(), 300).is_ok());
    }

    #[rstest]
    #[case::tampered_body(SECRET, br#"{"type":"x"}"#.as_slice())]
    #[case::wrong_secret("whsec_other", PAYLOAD)]
    fn mismatches_are_rejected(#[case] secret: &str, #[case] body: &[u8]) {
        let header = sign_payload(secret, fixture_now().timestamp(), PAYLOAD).expect("sign");
        let err = verify_event(SECRET, body, &header, fixture_now(), 300).expect_err("mismatch");
        assert!(matches!(err, PaymentGatewayError::InvalidSignature { .. }));
    }

    #[rstest]
    fn stale_signatures_are_rejected() {
        let signed_at = fixture_now() - TimeDelta::seconds(301);
        let header = sign_payload(SECRET, signed_at.timestamp(), PAYLOAD).expect("sign");
        let err = verify_event(SECRET, PAYLOAD, &header, fixture_now(), 300).expect_err("stale");
        assert_eq!(
            err,
            PaymentGatewayError::invalid_signature("signature timestamp outside tolerance")
        );
    }

    #[rstest]
    #[case("")]
    #[case("v1=abcd")]
    #[case("t=1700000000")]
    #[case("t=soon,v1=abcd")]
    #[case("t=-9223372036854775808,v1=00")]
    #[case("t=9223372036854775807,v1=00")]
    fn malformed_headers_are_rejected(#[case] header: &str) {
        let err = verify_event(SECRET, PAYLOAD, header, fixture_now(), 300).expect_err("header");
        assert!(matches!(err, PaymentGatewayError::InvalidSignature { .. }));
    }
}
