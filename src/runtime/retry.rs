// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policies and backoff strategies for resilient API calls.
//!
//! The retry handler consults a [`RetryPolicy`] for every failed attempt and
//! sleeps for the delay returned by the configured [`BackoffStrategy`].
//!
//! # Example
//!
//! ```
//! use hcloud::runtime::{ExponentialBackoff, ExponentialBackoffOpts, RetryConfig};
//! use std::time::Duration;
//!
//! let retry = RetryConfig::builder()
//!     .max_retries(3)
//!     .backoff(ExponentialBackoff::with_opts(ExponentialBackoffOpts {
//!         base: Duration::from_millis(500),
//!         multiplier: 2.0,
//!         cap: Duration::from_secs(10),
//!         jitter: true,
//!     }))
//!     .build();
//! assert_eq!(retry.max_retries, 3);
//! ```

use crate::error::{ErrorCode, HcloudError};
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Defines a backoff strategy for retry delays.
///
/// Any `Fn(u32) -> Duration` closure is a backoff strategy.
pub trait BackoffStrategy: Send + Sync + 'static {
    /// Calculate the delay before the next attempt.
    ///
    /// # Arguments
    /// * `retries` - How many retries were already performed (0 on the first call)
    fn delay(&self, retries: u32) -> Duration;
}

impl<F> BackoffStrategy for F
where
    F: Fn(u32) -> Duration + Send + Sync + 'static,
{
    fn delay(&self, retries: u32) -> Duration {
        self(retries)
    }
}

// =============================================================================
// Constant Backoff
// =============================================================================

/// Constant delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    /// Create a new constant backoff strategy.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Create a constant backoff with delay in milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

impl BackoffStrategy for ConstantBackoff {
    fn delay(&self, _retries: u32) -> Duration {
        self.delay
    }
}

// =============================================================================
// Exponential Backoff
// =============================================================================

/// Options for [`ExponentialBackoff::with_opts`].
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoffOpts {
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
    /// Full jitter: draw the delay uniformly from `[base, computed]`.
    pub jitter: bool,
}

impl Default for ExponentialBackoffOpts {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap: Duration::from_secs(60),
            jitter: true,
        }
    }
}

/// Truncated exponential backoff with optional full jitter.
///
/// The delay for `retries` is `min(cap, base * multiplier^retries)`. With
/// jitter enabled it is drawn uniformly from `[base, that value]`.
///
/// See <https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/>
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    opts: ExponentialBackoffOpts,
}

impl ExponentialBackoff {
    /// Exponential backoff truncated to 60 seconds, without jitter.
    #[must_use]
    pub fn new(multiplier: f64, base: Duration) -> Self {
        Self::with_opts(ExponentialBackoffOpts {
            base,
            multiplier,
            cap: Duration::from_secs(60),
            jitter: false,
        })
    }

    #[must_use]
    pub fn with_opts(opts: ExponentialBackoffOpts) -> Self {
        Self { opts }
    }

    /// The delay before jitter is applied.
    fn capped(&self, retries: u32) -> f64 {
        let base = self.opts.base.as_secs_f64();
        let exp = i32::try_from(retries).unwrap_or(i32::MAX);
        let backoff = base * self.opts.multiplier.powi(exp);
        backoff.min(self.opts.cap.as_secs_f64())
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::with_opts(ExponentialBackoffOpts::default())
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, retries: u32) -> Duration {
        let base = self.opts.base.as_secs_f64();
        let mut backoff = self.capped(retries);
        if self.opts.jitter {
            // Uniform in [base, backoff].
            backoff = (backoff - base) * rand::random::<f64>() + base;
        }
        Duration::try_from_secs_f64(backoff).unwrap_or(self.opts.cap)
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Determines whether a failed attempt should be retried.
pub trait RetryPolicy: Send + Sync + 'static {
    /// Returns `true` if the request should be retried for this error.
    fn should_retry(&self, err: &HcloudError) -> bool;
}

/// Default retry policy.
///
/// Retries API errors with code `conflict` or `rate_limit_exceeded`, the
/// status code error for `502 Bad Gateway` and `504 Gateway Timeout`, and
/// network errors reporting a timeout.
#[derive(Debug, Clone, Copy)]
pub struct DefaultRetryPolicy {
    retry_conflict: bool,
}

impl DefaultRetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            retry_conflict: true,
        }
    }

    /// Same as the default policy, but `conflict` errors fail immediately.
    #[must_use]
    pub fn without_conflict() -> Self {
        Self {
            retry_conflict: false,
        }
    }
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(&self, err: &HcloudError) -> bool {
        match err {
            HcloudError::Api(api) => match api.code {
                ErrorCode::RateLimitExceeded => true,
                ErrorCode::Conflict => self.retry_conflict,
                _ => false,
            },
            HcloudError::Status { status, .. } => matches!(
                *status,
                StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT
            ),
            HcloudError::Network(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Never retry - fail immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn should_retry(&self, _err: &HcloudError) -> bool {
        false
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

/// Complete retry configuration combining policy and backoff.
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Policy determining which errors to retry.
    pub policy: Arc<dyn RetryPolicy>,
    /// Backoff strategy for calculating delays.
    pub backoff: Arc<dyn BackoffStrategy>,
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl Default for RetryConfig {
    /// Five retries, exponential backoff (base 1s, multiplier 2, cap 60s,
    /// full jitter) and the [`DefaultRetryPolicy`].
    fn default() -> Self {
        Self {
            max_retries: 5,
            policy: Arc::new(DefaultRetryPolicy::new()),
            backoff: Arc::new(ExponentialBackoff::default()),
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Disable retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            policy: Arc::new(NoRetryPolicy),
            backoff: Arc::new(ConstantBackoff::new(Duration::ZERO)),
        }
    }
}

/// Builder for `RetryConfig`.
#[derive(Clone)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Create a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.config.max_retries = max;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn policy(mut self, policy: impl RetryPolicy) -> Self {
        self.config.policy = Arc::new(policy);
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub fn backoff(mut self, backoff: impl BackoffStrategy) -> Self {
        self.config.backoff = Arc::new(backoff);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Response;
    use crate::error::ApiError;
    use bytes::Bytes;
    use http::HeaderMap;

    fn status_error(status: StatusCode) -> HcloudError {
        HcloudError::Status {
            status,
            response: Box::new(Response::new(status, HeaderMap::new(), Bytes::new())),
        }
    }

    #[test]
    fn test_constant_backoff() {
        let backoff = ConstantBackoff::from_millis(100);
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(5), Duration::from_millis(100));
        assert_eq!(backoff.delay(100), Duration::from_millis(100));
    }

    #[test]
    fn test_closure_backoff() {
        let backoff = |retries: u32| Duration::from_millis(u64::from(retries) * 10);
        assert_eq!(BackoffStrategy::delay(&backoff, 3), Duration::from_millis(30));
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = ExponentialBackoff::new(2.0, Duration::from_millis(100));

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_exponential_backoff_monotonic_until_cap() {
        let cap = Duration::from_secs(60);
        let backoff = ExponentialBackoff::with_opts(ExponentialBackoffOpts {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap,
            jitter: false,
        });

        let mut previous = Duration::ZERO;
        for retries in 0..20 {
            let delay = backoff.delay(retries);
            assert!(delay >= previous, "delay decreased at {retries}");
            assert!(delay <= cap);
            previous = delay;
        }
        assert_eq!(backoff.delay(6), cap);
        assert_eq!(backoff.delay(19), cap);
        assert_eq!(backoff.delay(u32::MAX), cap);
    }

    #[test]
    fn test_exponential_backoff_jitter_envelope() {
        let opts = ExponentialBackoffOpts {
            base: Duration::from_millis(100),
            multiplier: 2.0,
            cap: Duration::from_secs(2),
            jitter: true,
        };
        let backoff = ExponentialBackoff::with_opts(opts);

        for retries in 0..10 {
            let upper = (0.1 * 2f64.powi(retries as i32)).min(2.0);
            for _ in 0..50 {
                let delay = backoff.delay(retries).as_secs_f64();
                // Allow for float to Duration rounding.
                assert!(delay >= 0.1 - 1e-9, "{delay} below base");
                assert!(delay <= upper + 1e-9, "{delay} above {upper}");
            }
        }
    }

    #[test]
    fn test_default_retry_policy_api_errors() {
        let policy = DefaultRetryPolicy::new();

        assert!(policy.should_retry(&ApiError::new(ErrorCode::Conflict, "").into()));
        assert!(policy.should_retry(&ApiError::new(ErrorCode::RateLimitExceeded, "").into()));
        assert!(policy.should_retry(&ApiError::new(ErrorCode::LIMIT_REACHED, "").into()));

        assert!(!policy.should_retry(&ApiError::new(ErrorCode::NotFound, "").into()));
        assert!(!policy.should_retry(&ApiError::new(ErrorCode::Locked, "").into()));
        assert!(!policy.should_retry(&ApiError::new(ErrorCode::InvalidInput, "").into()));
    }

    #[test]
    fn test_default_retry_policy_status_errors() {
        let policy = DefaultRetryPolicy::new();

        assert!(policy.should_retry(&status_error(StatusCode::BAD_GATEWAY)));
        assert!(policy.should_retry(&status_error(StatusCode::GATEWAY_TIMEOUT)));

        assert!(!policy.should_retry(&status_error(StatusCode::INTERNAL_SERVER_ERROR)));
        assert!(!policy.should_retry(&status_error(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!policy.should_retry(&status_error(StatusCode::NOT_FOUND)));
    }

    #[test]
    fn test_default_retry_policy_other_errors() {
        let policy = DefaultRetryPolicy::new();
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

        assert!(!policy.should_retry(&HcloudError::Decode {
            source: decode,
            response: None
        }));
        assert!(!policy.should_retry(&HcloudError::Config("x".to_string())));
    }

    #[test]
    fn test_retry_policy_without_conflict() {
        let policy = DefaultRetryPolicy::without_conflict();

        assert!(!policy.should_retry(&ApiError::new(ErrorCode::Conflict, "").into()));
        assert!(policy.should_retry(&ApiError::new(ErrorCode::RateLimitExceeded, "").into()));
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = NoRetryPolicy;
        assert!(!policy.should_retry(&status_error(StatusCode::BAD_GATEWAY)));
    }

    #[test]
    fn test_retry_config_builder() {
        let config = RetryConfig::builder()
            .max_retries(3)
            .backoff(ConstantBackoff::from_millis(200))
            .build();

        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff.delay(7), Duration::from_millis(200));
    }

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert!(config.backoff.delay(10) <= Duration::from_secs(60));
        assert!(config.backoff.delay(0) >= Duration::from_secs(1));

        let disabled = RetryConfig::disabled();
        assert_eq!(disabled.max_retries, 0);
    }
}
