//! Transport retry with exponential backoff for backend adapters
//!
//! Retries here cover transient network failures only. They are invisible to
//! the translator: a request that exhausts its transport retries surfaces as
//! a single backend error, not as repair attempts.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

/// A transport-level failure from an HTTP backend
#[derive(Debug)]
pub struct TransportError {
    /// HTTP status, when the server answered at all
    pub status: Option<u16>,
    pub message: String,
    /// Whether another attempt could plausibly succeed
    pub retryable: bool,
}

impl TransportError {
    pub fn retryable(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            status,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            status,
            message: message.into(),
            retryable: false,
        }
    }

    /// Classify an HTTP status: rate limits and server errors are transient
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let retryable = status == 429 || status >= 500;
        Self {
            status: Some(status),
            message: message.into(),
            retryable,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Retry policy configuration for transport failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in seconds)
    pub base_delay_secs: u64,
    /// Maximum delay between retries (in seconds)
    pub max_delay_secs: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1,
            max_delay_secs: 30,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Disable retries entirely
    pub fn none() -> Self {
        Self::new(0)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_secs(self.base_delay_secs),
            max_interval: Duration::from_secs(self.max_delay_secs),
            multiplier: self.multiplier,
            max_elapsed_time: None,
            ..Default::default()
        };
        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }
        backoff
    }
}

/// Execute an operation, retrying transient failures per the policy
pub async fn execute_with_retry<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TransportError>>,
{
    let mut backoff = policy.create_backoff();
    let mut attempts = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.retryable || attempts >= policy.max_attempts {
                    return Err(error);
                }
                attempts += 1;
                let delay = backoff
                    .next_backoff()
                    .unwrap_or(Duration::from_secs(policy.max_delay_secs));
                tracing::warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient backend failure, retrying: {}",
                    error
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_status_classification() {
        assert!(TransportError::from_status(429, "rate limited").retryable);
        assert!(TransportError::from_status(503, "unavailable").retryable);
        assert!(!TransportError::from_status(400, "bad request").retryable);
        assert!(!TransportError::from_status(401, "unauthorized").retryable);
    }

    #[tokio::test]
    async fn test_success_needs_no_retry() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TransportError>(42)
            },
            &RetryPolicy::default(),
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::permanent("bad request", Some(400)))
            },
            &RetryPolicy::default(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_retries_up_to_limit() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_secs: 0,
            max_delay_secs: 0,
            multiplier: 1.0,
            jitter: false,
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportError::retryable("connection reset", None))
            },
            &policy,
        )
        .await;
        assert!(result.is_err());
        // Initial attempt plus two retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_secs: 0,
            max_delay_secs: 0,
            multiplier: 1.0,
            jitter: false,
        };
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TransportError::from_status(502, "bad gateway"))
                    } else {
                        Ok("ok")
                    }
                }
            },
            &policy,
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
