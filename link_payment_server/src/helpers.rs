use hmac::{Hmac, Mac};
use log::trace;
use regex::Regex;
use sha2::Sha256;

/// Calculates the base64-encoded HMAC-SHA256 of `data`, which is how Shopify signs its webhooks.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length, so this never fails
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::default();
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// Returns the shop domain if `value` is a well-formed `*.myshopify.com` host. A scheme and path are tolerated,
/// so that the `dest` claim of a session token (`https://my-shop.myshopify.com`) can be passed in directly.
pub fn sanitize_shop(value: &str) -> Option<String> {
    let re = Regex::new(r"^(?:https?://)?([a-zA-Z0-9][a-zA-Z0-9-]*\.myshopify\.com)/?$").ok()?;
    let shop = re.captures(value.trim()).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_lowercase());
    trace!("Sanitized shop {value} -> {shop:?}");
    shop
}
