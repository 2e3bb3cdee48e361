use std::time::Duration;

use boiboi_common::Secret;
use log::*;

pub const DEFAULT_PAYSTACK_URL: &str = "https://api.paystack.co";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// Upper bound on every outbound call, connect time included.
    pub timeout: Duration,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PAYSTACK_URL.to_string(),
            secret_key: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PaystackConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("BB_PAYSTACK_BASE_URL").unwrap_or_else(|_| {
            debug!("🪛️ BB_PAYSTACK_BASE_URL not set, using {DEFAULT_PAYSTACK_URL}");
            DEFAULT_PAYSTACK_URL.to_string()
        });
        let secret_key = Secret::new(std::env::var("BB_PAYSTACK_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ BB_PAYSTACK_SECRET_KEY not set, using (probably useless) default");
            "sk_test_0000000000000000".to_string()
        }));
        let timeout = std::env::var("BB_PAYSTACK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid BB_PAYSTACK_TIMEOUT_SECS '{s}': {e}. Using the default instead"))
                    .ok()
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self { base_url, secret_key, timeout: Duration::from_secs(timeout) }
    }
}
