//! Centralized retry combinator shared by every capability adapter: an
//! async-fn wrapper taking a `RetryPolicy` plus an error-classifier
//! closure, so "retry transient, propagate permanent" is implemented once
//! instead of per-adapter.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Retry policy: max attempts (including the first), exponential base
/// delay, and an overall per-attempt timeout. Default matches 60 s timeout,
/// 3 retries, 0.5 s base backoff for external API calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
    pub operation_name: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryPolicy {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.pow(attempt)).min(self.max_delay)
    }
}

/// Run `operation` under `policy`, retrying while `is_retryable(&err)` is
/// true and attempts remain, with exponential backoff between attempts.
/// Each attempt is itself bounded by `policy.timeout`; a timed-out attempt
/// is treated as retryable. Returns the last error once attempts are
/// exhausted or `is_retryable` returns false.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, is_retryable: impl Fn(&E) -> bool, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + From<TimedOut>,
{
    let mut attempt = 0u32;
    loop {
        let result = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(E::from(TimedOut(policy.timeout))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < policy.max_attempts && is_retryable(&e) => {
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                debug!(op = %policy.operation_name, attempt, ?delay, error = %e, "retrying after transient error");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A single attempt exceeded `RetryPolicy::timeout`. Adapter error enums
/// implement `From<TimedOut>` to fold this into their own transient variant.
#[derive(Debug)]
pub struct TimedOut(pub Duration);

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out after {:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Transient,
        Permanent,
        TimedOut,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl From<TimedOut> for TestError {
        fn from(_: TimedOut) -> Self {
            TestError::TimedOut
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let policy = RetryPolicy::new("test").with_base_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result = with_retry(&policy, |_: &TestError| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let policy = RetryPolicy::new("test").with_base_delay(Duration::from_millis(1)).with_max_attempts(5);
        let calls = AtomicU32::new(0);
        let result = with_retry(
            &policy,
            |e: &TestError| *e == TestError::Transient,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok(99)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let policy = RetryPolicy::new("test").with_base_delay(Duration::from_millis(1)).with_max_attempts(5);
        let calls = AtomicU32::new(0);
        let result = with_retry(&policy, |e: &TestError| *e != TestError::Permanent, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(TestError::Permanent) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
