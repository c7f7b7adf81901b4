//! Retry delay computation

use messaging_config::RouterSettings;
use rand::Rng;
use std::time::Duration;

/// Highest exponent applied to the base delay
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Jittered exponential backoff: `base * 2^retries * random[0, 1)`
pub fn exponential_backoff(base: Duration, retries: u32) -> Duration {
    let factor = f64::from(1u32 << retries.min(MAX_BACKOFF_EXPONENT));
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    base.mul_f64(factor * jitter)
}

/// Retry timing for failed transmits
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Fixed part of every retry delay
    pub retry_interval: Duration,
    /// Cap for the computed delay
    pub max_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RouterSettings::default())
    }
}

impl From<&RouterSettings> for RetryPolicy {
    fn from(settings: &RouterSettings) -> Self {
        Self {
            retry_interval: settings.retry_interval(),
            max_retry_delay: settings.max_retry_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `retry_count` failed retries
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let delay = self.retry_interval + exponential_backoff(self.retry_interval, retry_count);
        delay.min(self.max_retry_delay)
    }
}
