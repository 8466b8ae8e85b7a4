//! Cryptographic utilities for webhook verification.
//!
//! Shared by the agent callback (`X-Webhook-Signature`) and the Stripe
//! webhook (`Stripe-Signature`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return the hex-encoded result (64 characters).
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    // `new_from_slice` only rejects keys for fixed-size MACs; HMAC takes any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check a hex HMAC-SHA256 signature of `body`.
///
/// Accepts an optional `sha256=` prefix on the signature.
#[must_use]
pub fn verify_hex_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let expected = hmac_sha256_hex(secret, body);
    !expected.is_empty() && constant_time_eq(&expected, &signature.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_known_vector() {
        // RFC 4231-style check against a widely published value.
        let result = hmac_sha256_hex("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(
            result,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn hmac_sha256_different_inputs() {
        assert_ne!(
            hmac_sha256_hex("secret", b"message1"),
            hmac_sha256_hex("secret", b"message2")
        );
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }

    #[test]
    fn verify_accepts_prefixed_and_uppercase() {
        let sig = hmac_sha256_hex("s3cret", b"{\"a\":1}");
        assert!(verify_hex_signature("s3cret", b"{\"a\":1}", &sig));
        assert!(verify_hex_signature(
            "s3cret",
            b"{\"a\":1}",
            &format!("sha256={}", sig.to_uppercase())
        ));
        assert!(!verify_hex_signature("other", b"{\"a\":1}", &sig));
        assert!(!verify_hex_signature("s3cret", b"{\"a\":2}", &sig));
    }
}
