// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime utilities for resilience and observability.
//!
//! This module provides the retry policies and backoff strategies used by
//! the request pipeline, and the metrics collector behind the client's
//! instrumentation option.

mod metrics;
mod retry;

pub use metrics::{MetricsCollector, MetricsConfig};
pub use retry::{
    BackoffStrategy, ConstantBackoff, DefaultRetryPolicy, ExponentialBackoff,
    ExponentialBackoffOpts, NoRetryPolicy, RetryConfig, RetryConfigBuilder, RetryPolicy,
};
