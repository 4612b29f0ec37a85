// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Handler;
use crate::client::{Request, Response};
use crate::error::Result;
use crate::runtime::RetryConfig;
use tracing::{debug, warn};

/// Re-sends failed requests while the retry policy allows it.
///
/// Every attempt sends an identical copy of the request, body included. The
/// wait between attempts comes from the backoff strategy and is cut short
/// when the request context is cancelled or expires.
pub(crate) struct RetryHandler<H> {
    next: H,
    config: RetryConfig,
}

impl<H: Handler> RetryHandler<H> {
    pub(crate) fn new(next: H, config: RetryConfig) -> Self {
        Self { next, config }
    }
}

impl<H: Handler> Handler for RetryHandler<H> {
    async fn handle(&self, req: Request) -> Result<Response> {
        let op = req.op_label();
        let mut retries: u32 = 0;

        loop {
            let err = match self.next.handle(req.clone()).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

            if err.is_cancelled() {
                return Err(err);
            }
            if req.ctx.is_done() {
                return Err(req.ctx.done_error(Some(err)));
            }
            if retries >= self.config.max_retries || !self.config.policy.should_retry(&err) {
                debug!(op_path = %op, retries, error = %err, "giving up");
                return Err(err);
            }

            let delay = self.config.backoff.delay(retries);
            retries += 1;
            warn!(
                op_path = %op,
                method = %req.method,
                attempt = retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = req.ctx.done() => return Err(req.ctx.done_error(Some(err))),
            }
        }
    }
}
