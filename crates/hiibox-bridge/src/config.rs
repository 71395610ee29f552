use backoff::ExponentialBackoff;
use std::time::Duration;

/// Configuration for chain calls made through [`crate::RetryingBridge`]
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum number of retry attempts after the first failure
    pub max_retries: usize,

    /// Backoff strategy for retry delays
    pub retry_backoff: ExponentialBackoff,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            retry_backoff: ExponentialBackoff {
                initial_interval: Duration::from_millis(250),
                max_interval: Duration::from_secs(5),
                max_elapsed_time: Some(Duration::from_secs(20)),
                multiplier: 2.0,
                ..Default::default()
            },
        }
    }
}

impl BridgeConfig {
    /// Millisecond-scale backoff, for tests and local ledgers
    pub fn fast(max_retries: usize) -> Self {
        Self {
            max_retries,
            retry_backoff: ExponentialBackoff {
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(5),
                max_elapsed_time: Some(Duration::from_secs(2)),
                multiplier: 2.0,
                randomization_factor: 0.0,
                ..Default::default()
            },
        }
    }
}
