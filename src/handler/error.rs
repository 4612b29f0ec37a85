// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Handler;
use crate::client::{Request, Response};
use crate::error::{ApiError, ErrorResponse, HcloudError, Result};
use tracing::debug;

/// Turns 4xx and 5xx responses into errors.
///
/// A JSON body carrying an error code or message becomes
/// [`HcloudError::Api`]; anything else becomes [`HcloudError::Status`].
/// Both keep the response attached.
pub(crate) struct ErrorHandler<H> {
    next: H,
}

impl<H: Handler> ErrorHandler<H> {
    pub(crate) fn new(next: H) -> Self {
        Self { next }
    }
}

impl<H: Handler> Handler for ErrorHandler<H> {
    async fn handle(&self, req: Request) -> Result<Response> {
        let resp = self.next.handle(req).await?;
        let status = resp.status();
        if !(status.is_client_error() || status.is_server_error()) {
            return Ok(resp);
        }

        if let Some(err) = api_error(&resp) {
            debug!(code = %err.code, status = status.as_u16(), "API error");
            return Err(HcloudError::Api(err));
        }
        Err(HcloudError::Status {
            status,
            response: Box::new(resp),
        })
    }
}

fn api_error(resp: &Response) -> Option<ApiError> {
    if !resp.has_json_body() {
        return None;
    }
    let body: ErrorResponse = serde_json::from_slice(resp.body()).ok()?;
    ApiError::from_body(body.error, resp)
}
