//! Execution strategies: run an operation once, or retry transient failures
//! with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{ProviderOptions, RetryConfig};
use crate::error::{ProviderError, Result};

/// Server error numbers that are always treated as transient.
pub const TRANSIENT_ERROR_NUMBERS: &[i32] = &[
    49920, 49919, 49918, 41839, 41325, 41305, 41302, 41301, 40613, 40501, 40197, 10936, 10929,
    10928, 10060, 10054, 10053, 4221, 4060, 1205, 233, 121, 64, 20, -2,
];

/// Base of the backoff delay.
const DELAY_COEFFICIENT: Duration = Duration::from_secs(1);

/// Strategy used to run database operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run once and surface any error.
    #[default]
    NonRetrying,
    /// Retry transient failures.
    Retrying(RetryingStrategy),
}

impl ExecutionStrategy {
    /// Strategy selected by the provider options.
    pub fn from_options(options: &ProviderOptions) -> Self {
        match &options.retry_on_failure {
            Some(retry) => ExecutionStrategy::Retrying(RetryingStrategy::from_config(retry)),
            None => ExecutionStrategy::NonRetrying,
        }
    }

    pub fn retries_on_failure(&self) -> bool {
        matches!(self, ExecutionStrategy::Retrying(_))
    }

    /// Run `operation` until it succeeds, fails permanently or `cancel` fires.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let strategy = match self {
            ExecutionStrategy::NonRetrying => {
                if cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }
                return operation().await;
            }
            ExecutionStrategy::Retrying(strategy) => strategy,
        };

        let mut retry_count = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry_count >= strategy.max_retry_count || !strategy.should_retry_on(&err) {
                return Err(err);
            }
            retry_count += 1;
            let delay = strategy.next_delay(retry_count);
            warn!(
                "Transient failure (attempt {}/{}), retrying in {:?}: {}",
                retry_count, strategy.max_retry_count, delay, err
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Exponential backoff over transient server errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryingStrategy {
    pub max_retry_count: u32,
    pub max_retry_delay: Duration,
    pub additional_error_numbers: Vec<i32>,
}

impl Default for RetryingStrategy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryingStrategy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retry_count: config.max_retry_count,
            max_retry_delay: Duration::from_secs(config.max_retry_delay_secs),
            additional_error_numbers: config.error_numbers_to_add.clone(),
        }
    }

    pub fn should_retry_on(&self, err: &ProviderError) -> bool {
        err.error_number().is_some_and(|n| {
            TRANSIENT_ERROR_NUMBERS.contains(&n) || self.additional_error_numbers.contains(&n)
        })
    }

    /// Delay before retry number `retry_count` (1-based): `2^n - 1` seconds,
    /// capped at the maximum delay.
    pub fn next_delay(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).map(|p| p - 1).unwrap_or(u32::MAX);
        DELAY_COEFFICIENT
            .checked_mul(factor)
            .map_or(self.max_retry_delay, |d| d.min(self.max_retry_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn strategy(extra: Vec<i32>) -> RetryingStrategy {
        RetryingStrategy {
            max_retry_count: 3,
            max_retry_delay: Duration::from_secs(30),
            additional_error_numbers: extra,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let s = strategy(vec![]);
        assert_eq!(s.next_delay(1), Duration::from_secs(1));
        assert_eq!(s.next_delay(2), Duration::from_secs(3));
        assert_eq!(s.next_delay(3), Duration::from_secs(7));
        assert_eq!(s.next_delay(5), Duration::from_secs(30));
        assert_eq!(s.next_delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_transient_classification() {
        let s = strategy(vec![-1, 1807, 42008, 42019]);
        assert!(s.should_retry_on(&ProviderError::server(1205, "deadlock")));
        assert!(s.should_retry_on(&ProviderError::server(-2, "timeout")));
        assert!(s.should_retry_on(&ProviderError::server(1807, "lock")));
        assert!(!s.should_retry_on(&ProviderError::server(2627, "duplicate key")));
        assert!(!s.should_retry_on(&ProviderError::Config("x".into())));
    }

    #[test]
    fn test_from_options() {
        let mut options = ProviderOptions::default();
        assert_eq!(ExecutionStrategy::from_options(&options), ExecutionStrategy::NonRetrying);
        options.retry_on_failure = Some(RetryConfig::default());
        let strategy = ExecutionStrategy::from_options(&options);
        assert!(strategy.retries_on_failure());
        assert_eq!(strategy, ExecutionStrategy::Retrying(RetryingStrategy::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_recovers_from_transient_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let strategy = ExecutionStrategy::Retrying(strategy(vec![]));
        let result = strategy
            .execute(&CancellationToken::new(), move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::server(1205, "deadlock"))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_gives_up_with_original_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let strategy = ExecutionStrategy::Retrying(strategy(vec![]));
        let err = strategy
            .execute(&CancellationToken::new(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::server(1205, "deadlock"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_number(), Some(1205));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retrying_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = ExecutionStrategy::NonRetrying
            .execute(&CancellationToken::new(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::server(1205, "deadlock"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Server { number: 1205, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let err = ExecutionStrategy::NonRetrying
            .execute(&token, || async { Ok(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
    }
}
