// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request descriptor and per-call context.

use crate::error::HcloudError;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call context: cancellation, deadline and the operation path.
///
/// Clones share the same cancellation token, so cancelling the context a
/// call was started with stops every retry attempt of that call.
///
/// # Example
///
/// ```
/// use hcloud::RequestContext;
/// use std::time::Duration;
///
/// let ctx = RequestContext::new().with_timeout(Duration::from_secs(30));
/// let cancel = ctx.cancellation_token();
/// // Later, from another task:
/// cancel.cancel();
/// assert!(ctx.is_done());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    op_path: Option<&'static str>,
}

impl RequestContext {
    /// Create a context that is never cancelled on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Expire the context at the given instant.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Expire the context after the given duration.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tag the context with an operation path, the URL template of the
    /// operation before substitution (e.g. `/servers/%d/actions/reboot`).
    #[must_use]
    pub fn with_op_path(mut self, op_path: &'static str) -> Self {
        self.op_path = Some(op_path);
        self
    }

    pub fn op_path(&self) -> Option<&'static str> {
        self.op_path
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The token that cancels this context.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns whether the context was cancelled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The error reported once the context is done. `last_error` is the
    /// most recent pipeline error, kept for diagnostics.
    pub(crate) fn done_error(&self, last_error: Option<HcloudError>) -> HcloudError {
        let last_error = last_error.map(Box::new);
        if self.cancel.is_cancelled() {
            HcloudError::Cancelled { last_error }
        } else {
            HcloudError::DeadlineExceeded { last_error }
        }
    }

    /// Resolves once the context is cancelled or expired.
    pub(crate) async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}

/// A request against the API, ready to enter the handler chain.
///
/// The body is an owned buffer so it can be re-sent on every retry attempt.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
    pub(crate) ctx: RequestContext,
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the endpoint, including the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Label used for metrics and logs: the operation path when the
    /// context carries one, otherwise the request path without its query
    /// and with numeric segments replaced by `-`.
    pub(crate) fn op_label(&self) -> String {
        match self.ctx.op_path {
            Some(op_path) => op_path.to_string(),
            None => path_label(&self.path),
        }
    }
}

fn path_label(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "-"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
