use clap::Args;
use std::time::Duration;

pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CHECKOUT_URL: &str = "https://checkout.example.com";

/// Runtime settings for the engine.
///
/// Every field can be given as a flag or through its environment variable.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Upper bound for a single payment gateway call, in milliseconds.
    #[arg(
        long = "gateway-timeout-ms",
        env = "PLEDGE_GATEWAY_TIMEOUT_MS",
        default_value_t = DEFAULT_GATEWAY_TIMEOUT_MS
    )]
    pub gateway_timeout_ms: u64,

    /// Base URL of the hosted checkout page.
    #[arg(long = "checkout-url", env = "PLEDGE_CHECKOUT_URL", default_value = DEFAULT_CHECKOUT_URL)]
    pub checkout_url: String,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log", env = "PLEDGE_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        // Saturates rather than wrapping for durations beyond u64 milliseconds.
        self.gateway_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_timeout_ms: DEFAULT_GATEWAY_TIMEOUT_MS,
            checkout_url: DEFAULT_CHECKOUT_URL.to_string(),
            log_filter: "info".to_string(),
        }
    }
}
