use std::time::Duration;

use log::*;

pub const DEFAULT_LINK_API_URL: &str = "https://api.link.xyz";
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Base URL of the LINK API, without a trailing slash.
    pub base_url: String,
    /// Upper bound on each request to the processor.
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_LINK_API_URL.to_string(), timeout: DEFAULT_LINK_TIMEOUT }
    }
}

impl LinkConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), timeout }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("LPG_LINK_API_URL").unwrap_or_else(|_| {
            info!("🔗 LPG_LINK_API_URL not set, using {DEFAULT_LINK_API_URL}");
            DEFAULT_LINK_API_URL.to_string()
        });
        Self::new(&base_url, DEFAULT_LINK_TIMEOUT)
    }
}
