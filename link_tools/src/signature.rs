use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const LINK_SIGNATURE_HEADER: &str = "x-link-signature";

/// Checks that `signature` is the hex-encoded HMAC-SHA256 of the exact request body, keyed with the shared webhook
/// secret. The comparison is constant-time.
///
/// A missing, empty or non-hex signature, or an empty secret, never verifies.
pub fn verify_webhook_signature(raw_body: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        debug!("🔐️ Webhook request carried no signature");
        return false;
    };
    if secret.is_empty() {
        warn!("🔐️ No webhook secret is configured. Refusing to accept any signature.");
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        debug!("🔐️ Webhook signature is not valid hex");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}

/// Produces the signature LINK would attach to `raw_body`.
pub fn sign_webhook_payload(raw_body: &[u8], secret: &str) -> String {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(raw_body);
            hex::encode(mac.finalize().into_bytes())
        },
        // HMAC accepts keys of any length
        Err(_) => String::default(),
    }
}
