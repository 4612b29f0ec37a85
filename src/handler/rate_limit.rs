// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Handler;
use crate::client::{
    RateLimit, Request, Response, HEADER_RATELIMIT_LIMIT, HEADER_RATELIMIT_REMAINING,
    HEADER_RATELIMIT_RESET,
};
use crate::error::Result;

/// Copies the rate limit headers into the response metadata.
pub(crate) struct RateLimitHandler<H> {
    next: H,
}

impl<H: Handler> RateLimitHandler<H> {
    pub(crate) fn new(next: H) -> Self {
        Self { next }
    }
}

impl<H: Handler> Handler for RateLimitHandler<H> {
    async fn handle(&self, req: Request) -> Result<Response> {
        let mut resp = self.next.handle(req).await?;
        resp.meta.rate_limit = RateLimit {
            limit: resp.header_i64(HEADER_RATELIMIT_LIMIT),
            remaining: resp.header_i64(HEADER_RATELIMIT_REMAINING),
            reset: resp.header_i64(HEADER_RATELIMIT_RESET),
        };
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestContext;
    use crate::handler::testing::{json_response, request, Scripted};
    use http::HeaderValue;

    #[tokio::test]
    async fn test_rate_limit_headers() {
        let inner = Scripted::new(|_| {
            let mut resp = json_response(200, "{}");
            let headers = resp.headers_mut();
            headers.insert(HEADER_RATELIMIT_LIMIT, HeaderValue::from_static("3600"));
            headers.insert(HEADER_RATELIMIT_REMAINING, HeaderValue::from_static("3599"));
            headers.insert(HEADER_RATELIMIT_RESET, HeaderValue::from_static("1700000000"));
            Ok(resp)
        });
        let handler = RateLimitHandler::new(inner);

        let resp = handler.handle(request(RequestContext::new())).await.unwrap();
        assert_eq!(resp.meta.rate_limit.limit, 3600);
        assert_eq!(resp.meta.rate_limit.remaining, 3599);
        assert_eq!(resp.meta.rate_limit.reset, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_missing_or_garbled_headers_are_zero() {
        let inner = Scripted::new(|_| {
            let mut resp = json_response(200, "{}");
            resp.headers_mut()
                .insert(HEADER_RATELIMIT_LIMIT, HeaderValue::from_static("lots"));
            Ok(resp)
        });
        let handler = RateLimitHandler::new(inner);

        let resp = handler.handle(request(RequestContext::new())).await.unwrap();
        assert_eq!(resp.meta.rate_limit, RateLimit::default());
    }
}
