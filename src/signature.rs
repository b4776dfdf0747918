use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const SUPPORTED_ALGORITHM: &str = "sha256";

/// Verifies `X-Hub-Signature-256` headers against a shared webhook secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns true if `signature_header` is `sha256=<hex>` and the hex digest is the
    /// HMAC-SHA256 of `payload` keyed with the shared secret.
    ///
    /// An empty secret never verifies. The digest comparison is constant-time.
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> bool {
        if self.secret.is_empty() {
            debug!("No webhook secret configured");
            return false;
        }

        let Some(header) = signature_header.filter(|h| !h.is_empty()) else {
            return false;
        };

        // Exactly one '=' between algorithm and digest
        let mut parts = header.split('=');
        let (Some(algorithm), Some(digest), None) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if algorithm != SUPPORTED_ALGORITHM {
            return false;
        }

        // GitHub sends lowercase hex
        if digest.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        let Ok(expected) = hex_decode(digest) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Computes the `sha256=<hex>` header value GitHub would send for `payload`.
#[cfg(test)]
pub(crate) fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!(
        "{}={}",
        SUPPORTED_ALGORITHM,
        hex::encode(mac.finalize().into_bytes())
    )
}
