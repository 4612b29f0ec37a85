// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Handler;
use crate::client::{Request, Response};
use crate::error::{HcloudError, Result};
use crate::runtime::MetricsCollector;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Performs the HTTP round trip and reads the full body into the response.
pub(crate) struct TransportHandler {
    http: reqwest::Client,
    endpoint: String,
    metrics: Option<Arc<MetricsCollector>>,
}

impl TransportHandler {
    pub(crate) fn new(
        http: reqwest::Client,
        endpoint: String,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            http,
            endpoint,
            metrics,
        }
    }

    async fn round_trip(&self, req: &Request) -> std::result::Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.endpoint, req.path);
        let mut builder = self
            .http
            .request(req.method.clone(), url)
            .headers(req.headers.clone());
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        // Read the body exactly once; everything above works on the copy.
        let body = resp.bytes().await?;
        Ok(Response::new(status, headers, body))
    }
}

impl Handler for TransportHandler {
    async fn handle(&self, req: Request) -> Result<Response> {
        let op = req.op_label();
        let start = Instant::now();

        let result = tokio::select! {
            result = self.round_trip(&req) => result,
            _ = req.ctx.done() => {
                trace!(op_path = %op, "round trip interrupted by context");
                return Err(req.ctx.done_error(None));
            }
        };

        let elapsed = start.elapsed();
        let code = match &result {
            Ok(resp) => resp.status().as_str().to_string(),
            Err(_) => "error".to_string(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_request(req.method.as_str(), &op, &code, elapsed);
        }
        trace!(
            op_path = %op,
            method = %req.method,
            status = %code,
            elapsed_ms = elapsed.as_millis() as u64,
            "round trip finished"
        );

        result.map_err(HcloudError::Network)
    }
}
