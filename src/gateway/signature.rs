//! Webhook signature verification.
//!
//! The gateway signs each delivery with HMAC-SHA256 over `"<t>.<raw body>"`
//! and sends `Stripe-Signature: t=<unix seconds>,v1=<hex digest>[,v1=...]`.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),
    #[error("signature timestamp {timestamp} outside tolerance (now {now})")]
    TimestampOutsideTolerance { timestamp: i64, now: i64 },
    #[error("no signature matches the payload")]
    SignatureMismatch,
    #[error("webhook secret is not usable as an HMAC key")]
    InvalidSecret,
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").field("tolerance", &self.tolerance).finish_non_exhaustive()
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, VerificationError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(VerificationError::MalformedHeader(format!("unexpected element {part:?}")));
        };
        match key {
            "t" => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| VerificationError::MalformedHeader(format!("bad timestamp {value:?}")))?;
                timestamp = Some(parsed);
            }
            // unknown schemes such as v0 are ignored; a malformed v1 simply never matches
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| VerificationError::MalformedHeader("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(VerificationError::MalformedHeader("missing v1 signature".into()));
    }
    Ok(SignatureHeader { timestamp, signatures })
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self { secret: secret.into(), tolerance }
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, VerificationError> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| VerificationError::InvalidSecret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), VerificationError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verifies against an explicit clock reading, in unix seconds.
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), VerificationError> {
        let parsed = parse_header(header)?;
        if now.abs_diff(parsed.timestamp) > self.tolerance.as_secs() {
            return Err(VerificationError::TimestampOutsideTolerance { timestamp: parsed.timestamp, now });
        }
        let mac = self.mac(parsed.timestamp, payload)?;
        // verify_slice compares in constant time
        if parsed.signatures.iter().any(|candidate| mac.clone().verify_slice(candidate).is_ok()) {
            Ok(())
        } else {
            Err(VerificationError::SignatureMismatch)
        }
    }

    /// Produces a header value the verifier accepts.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, VerificationError> {
        let digest = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const NOW: i64 = 1_700_000_000;
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("whsec_test123secret456", Duration::from_secs(300))
    }

    #[test]
    fn test_accepts_own_signature() {
        let header = verifier().sign(PAYLOAD, NOW).unwrap();
        assert_eq!(verifier().verify_at(PAYLOAD, &header, NOW + 10), Ok(()));
    }

    #[test]
    fn test_accepts_any_matching_v1() {
        let good = verifier().sign(PAYLOAD, NOW).unwrap();
        let digest = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1={},v0=legacy,v1={digest}", "00".repeat(32));
        assert_eq!(verifier().verify_at(PAYLOAD, &header, NOW), Ok(()));
    }

    #[test]
    fn test_rejects_modified_payload_and_wrong_secret() {
        let header = verifier().sign(PAYLOAD, NOW).unwrap();
        assert_eq!(
            verifier().verify_at(b"{\"id\":\"evt_2\"}", &header, NOW),
            Err(VerificationError::SignatureMismatch)
        );

        let forged = WebhookVerifier::new("wrong_secret", Duration::from_secs(300)).sign(PAYLOAD, NOW).unwrap();
        assert_eq!(verifier().verify_at(PAYLOAD, &forged, NOW), Err(VerificationError::SignatureMismatch));
    }

    #[rstest]
    #[case::too_old(NOW - 600)]
    #[case::too_far_ahead(NOW + 600)]
    fn test_rejects_timestamp_outside_tolerance(#[case] signed_at: i64) {
        let header = verifier().sign(PAYLOAD, signed_at).unwrap();
        assert_eq!(
            verifier().verify_at(PAYLOAD, &header, NOW),
            Err(VerificationError::TimestampOutsideTolerance { timestamp: signed_at, now: NOW })
        );
    }

    #[rstest]
    #[case::garbage("garbage")]
    #[case::missing_timestamp("v1=abcdef")]
    #[case::missing_signature("t=1700000000")]
    #[case::bad_timestamp("t=yesterday,v1=abcdef")]
    fn test_rejects_malformed_headers(#[case] header: &str) {
        assert!(matches!(
            verifier().verify_at(PAYLOAD, header, NOW),
            Err(VerificationError::MalformedHeader(_))
        ));
    }
}
