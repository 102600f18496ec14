//! HMAC-SHA256 signatures on inbound payment notifications.
//!
//! The sender signs the raw request body with the shared webhook secret and
//! sends `X-Signature: sha256=<hex>`. Verification must run on the raw bytes,
//! before any JSON parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// Hex-encoded HMAC of `body`, formatted the way the header carries it.
pub fn sign(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Constant-time check of an `X-Signature` header value against `body`.
pub fn verify(secret: &[u8], body: &[u8], header_value: &str) -> bool {
    let Some(sig_hex) = header_value.trim().strip_prefix("sha256=") else {
        tracing::warn!("signature header missing `sha256=` prefix");
        return false;
    };
    let Ok(expected) = hex::decode(sig_hex) else {
        tracing::warn!("signature header is not valid hex");
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(e) => {
            tracing::error!(error = %e, "invalid webhook secret");
            return false;
        }
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
