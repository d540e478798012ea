use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retry attempts after the first run.
    pub retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// the policy runs out of attempts.
pub async fn with_retry<F, Fut, T>(mut operation: F, policy: RetryPolicy) -> Result<T, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if attempt <= policy.retries && is_transient(&err) => {
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, policy.retries, err
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
