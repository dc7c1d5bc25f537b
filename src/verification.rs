use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SHA256_PREFIX: &str = "sha256=";

/// Hex-encoded HMAC-SHA256 of `body`, prefixed with `sha256=`.
/// This is the header value GitHub and Bitbucket send.
pub fn sign_hmac_sha256(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("{SHA256_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `sha256=<hex>` signature header against `body`.
///
/// An empty secret means no secret is configured and the check passes.
/// The digest comparison is constant-time.
pub fn verify_hmac_sha256(secret: &str, body: &[u8], signature_header: &str) -> bool {
    if secret.is_empty() {
        return true;
    }

    let expected_hex = match signature_header.strip_prefix(SHA256_PREFIX) {
        Some(h) => h,
        None => return false,
    };
    let expected = match hex::decode(expected_hex) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Plain token comparison, as GitLab sends the configured secret verbatim.
pub fn verify_token(secret: &str, header_value: &str) -> bool {
    header_value == secret
}
