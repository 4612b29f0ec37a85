// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request pipeline.
//!
//! Every request passes through a fixed chain of handlers, each wrapping the
//! next one:
//!
//! ```text
//! parse -> retry -> error -> rate limit -> debug -> transport
//! ```
//!
//! The transport reads the whole body once; everything above it works on
//! the cached body of the [`Response`]. The retry handler sits above error
//! classification so its policy sees typed errors, and below parsing so
//! failed attempts are never decoded.

mod debug;
mod error;
mod parse;
mod rate_limit;
mod retry;
mod transport;

pub use debug::DebugSink;

pub(crate) use debug::DebugHandler;
pub(crate) use error::ErrorHandler;
pub(crate) use parse::{decode_json, write_body, ParseHandler};
pub(crate) use rate_limit::RateLimitHandler;
pub(crate) use retry::RetryHandler;
pub(crate) use transport::TransportHandler;

use crate::client::{Request, Response};
use crate::error::Result;
use crate::runtime::{MetricsCollector, RetryConfig};
use std::future::Future;
use std::sync::Arc;

/// A single stage of the request pipeline.
pub(crate) trait Handler: Send + Sync {
    fn handle(&self, req: Request) -> impl Future<Output = Result<Response>> + Send;
}

/// The assembled pipeline, outermost handler first.
pub(crate) type Chain =
    ParseHandler<RetryHandler<ErrorHandler<RateLimitHandler<DebugHandler<TransportHandler>>>>>;

/// Everything the chain needs from the client configuration.
pub(crate) struct ChainParts {
    pub http: reqwest::Client,
    pub endpoint: String,
    pub retry: RetryConfig,
    pub debug: Option<DebugSink>,
    pub metrics: Option<Arc<MetricsCollector>>,
}

/// Assembles the chain innermost first:
/// `transport -> [debug] -> rate limit -> error -> retry -> parse`.
pub(crate) fn assemble(parts: ChainParts) -> Chain {
    let transport = TransportHandler::new(parts.http, parts.endpoint.clone(), parts.metrics);
    let debug = DebugHandler::new(transport, parts.debug, parts.endpoint);
    let rate_limit = RateLimitHandler::new(debug);
    let errors = ErrorHandler::new(rate_limit);
    let retry = RetryHandler::new(errors, parts.retry);
    ParseHandler::new(retry)
}
