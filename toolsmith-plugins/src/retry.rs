use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::time::Duration;
use toolsmith_engine::config::RefreshConfig;
use tracing::{info, warn};

use crate::error::{PluginError, Result};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Some(Duration::from_secs(60)),
        }
    }
}

impl From<&RefreshConfig> for RetryConfig {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            ..Default::default()
        }
    }
}

impl RetryConfig {
    /// No second attempts.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_interval: Duration::from_secs(0),
            max_interval: Duration::from_secs(0),
            max_elapsed_time: Some(Duration::from_secs(0)),
        }
    }

    /// Create an exponential backoff from this configuration
    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: self.max_elapsed_time,
            ..Default::default()
        }
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Errors that [`PluginError::is_transient`] rejects are returned at once.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let backoff = config.to_backoff();
    let mut attempt = 0;

    retry(backoff, || {
        attempt += 1;
        let op = operation();

        async move {
            match op.await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", operation_name, attempt);
                    }
                    Ok(result)
                }
                Err(e) if !e.is_transient() => Err(backoff::Error::permanent(e)),
                Err(e) => {
                    if attempt <= config.max_retries {
                        warn!(
                            "{} failed on attempt {} of {}: {}. Retrying...",
                            operation_name,
                            attempt,
                            config.max_retries + 1,
                            e
                        );
                        Err(backoff::Error::transient(e))
                    } else {
                        warn!("{} failed after {} attempts: {}", operation_name, attempt, e);
                        Err(backoff::Error::permanent(e))
                    }
                }
            }
        }
    })
    .await
}
