//! Webhook signature signing and verification.
//!
//! Header format: `t=<unix seconds>,v1=<hex HMAC-SHA256 of "<t>.<payload>">`.
//! Multiple `v1` entries may be present while a secret is being rotated.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    MalformedHeader,
    #[error("signature timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("no signature matches the payload")]
    Mismatch,
}

/// Produce a signature header value for `payload` at `timestamp`.
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mac = signed_mac(secret, payload, timestamp);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature header against `payload`.
///
/// `now` and `tolerance_secs` bound the accepted timestamp age in either direction.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                )
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| signed_mac(secret, payload, timestamp).verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn signed_mac(secret: &str, payload: &[u8], timestamp: i64) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}
