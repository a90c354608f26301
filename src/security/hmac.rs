/// HMAC-based device authentication for license validation
/// Proves the caller holds the shared secret and bounds replay to a time window

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed distance between request timestamp and server clock (seconds)
pub const TIMESTAMP_TOLERANCE: i64 = 300; // 5 minutes

/// Why a device failed authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("missing authentication field: {0}")]
    MissingField(&'static str),

    #[error("timestamp outside the accepted window")]
    TimestampOutOfWindow,

    #[error("authentication signature does not match")]
    SignatureMismatch,
}

/// Verifies `HMAC-SHA256(secret, device_id:timestamp)` proofs sent by devices
pub struct AuthVerifier {
    keyed: HmacSha256,
}

impl AuthVerifier {
    pub fn new(shared_secret: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            keyed: keyed_mac(shared_secret.as_bytes())?,
        })
    }

    /// Lowercase hex HMAC over the signing message of a device request
    pub fn expected_signature(&self, device_id: &str, timestamp: i64) -> String {
        let mut mac = self.keyed.clone();
        mac.update(construct_signature_data(device_id, timestamp).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a device proof against the clock value `now` (unix seconds)
    pub fn verify_at(
        &self,
        device_id: &str,
        timestamp: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), AuthFailure> {
        if device_id.is_empty() {
            return Err(AuthFailure::MissingField("device_id"));
        }
        if signature.is_empty() {
            return Err(AuthFailure::MissingField("signature"));
        }

        if !validate_timestamp(timestamp, now) {
            log::warn!(
                "Timestamp validation failed for {}: diff={} seconds (tolerance={} seconds)",
                device_id,
                now.saturating_sub(timestamp).saturating_abs(),
                TIMESTAMP_TOLERANCE
            );
            return Err(AuthFailure::TimestampOutOfWindow);
        }

        let expected = self.expected_signature(device_id, timestamp);
        if !constant_time_eq(signature, &expected) {
            return Err(AuthFailure::SignatureMismatch);
        }

        Ok(())
    }

    /// Check a device proof against the current system clock
    pub fn verify(&self, device_id: &str, timestamp: i64, signature: &str) -> Result<(), AuthFailure> {
        self.verify_at(device_id, timestamp, signature, chrono::Utc::now().timestamp())
    }
}

/// Generate HMAC-SHA256 signature
///
/// # Returns
/// Lowercase hex-encoded signature string
pub fn create_signature(data: &str, secret: &[u8]) -> Result<String, CryptoError> {
    let mut mac = keyed_mac(secret)?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn keyed_mac(secret: &[u8]) -> Result<HmacSha256, CryptoError> {
    <HmacSha256 as Mac>::new_from_slice(secret)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid HMAC secret: {}", e)))
}

/// Validate timestamp to bound replay of captured requests
///
/// Accepts only `|now - timestamp| < TIMESTAMP_TOLERANCE`
pub fn validate_timestamp(timestamp: i64, now: i64) -> bool {
    now.saturating_sub(timestamp).saturating_abs() < TIMESTAMP_TOLERANCE
}

/// Construct the message a device signs: `device_id:timestamp`
pub fn construct_signature_data(device_id: &str, timestamp: i64) -> String {
    format!("{}:{}", device_id, timestamp)
}

/// Compare two strings without short-circuiting on the first differing byte
pub fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    // Length is not secret (always 64 hex chars for a valid proof)
    if provided.len() != expected.len() {
        return false;
    }

    provided.ct_eq(expected).into()
}

/// Generate a cryptographically secure random secret
///
/// # Returns
/// 64-character hex string (32 bytes of entropy)
pub fn generate_shared_secret() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);

    hex::encode(bytes)
}
