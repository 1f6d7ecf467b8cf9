//! Exponential backoff with jitter for transient provider failures.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AssistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "RetryConfig::default_max_retries")]
    pub max_retries: u32,
    #[serde(with = "crate::serde_millis", default = "RetryConfig::default_base_delay")]
    pub base_delay: Duration,
    #[serde(with = "crate::serde_millis", default = "RetryConfig::default_max_delay")]
    pub max_delay: Duration,
    /// Add up to 50% random delay on top of the backoff.
    #[serde(default = "RetryConfig::default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            base_delay: Self::default_base_delay(),
            max_delay: Self::default_max_delay(),
            jitter: Self::default_jitter(),
        }
    }
}

impl RetryConfig {
    fn default_max_retries() -> u32 {
        2
    }

    fn default_base_delay() -> Duration {
        Duration::from_millis(200)
    }

    fn default_max_delay() -> Duration {
        Duration::from_secs(2)
    }

    fn default_jitter() -> bool {
        true
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
        let delay = exponential.min(self.max_delay.as_millis() as u64);
        if self.jitter {
            Duration::from_millis(delay + fastrand::u64(0..=delay / 2))
        } else {
            Duration::from_millis(delay)
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// retries. Only [`AssistError::is_transient`] errors are retried.
pub async fn retry_transient<T, F, Fut>(
    config: &RetryConfig,
    provider: &str,
    mut operation: F,
) -> Result<T, AssistError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AssistError>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                let delay = config.delay_for(attempt);
                tracing::warn!(
                    target: "lostfound::assist",
                    provider,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
