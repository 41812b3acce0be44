use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy for a single logical request.
///
/// `max_retries` counts retries, not attempts: `max_retries = 1` means the
/// operation runs at most twice.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Runs `operation` until it succeeds or the retry budget is spent, sleeping
/// the fixed delay between attempts. Returns the last error on exhaustion.
pub async fn with_retry<T, E, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(config, operation_name, operation, |_| true).await
}

/// Like [`with_retry`], but errors for which `should_retry` returns `false`
/// are returned immediately without sleeping.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    debug!("{} failed with non-retryable error: {}", operation_name, e);
                    return Err(e);
                }
                if attempt >= config.max_retries {
                    debug!(
                        "{} failed after {} attempts. Last error: {}",
                        operation_name,
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }

                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name,
                    attempt + 1,
                    config.attempts(),
                    config.delay,
                    e
                );
                tokio::time::sleep(config.delay).await;
                attempt += 1;
            }
        }
    }
}
