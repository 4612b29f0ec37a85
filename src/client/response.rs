// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelope returned by every API call.

use bytes::{Buf, Bytes};
use http::{header, HeaderMap, StatusCode};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) const HEADER_CORRELATION_ID: &str = "x-correlation-id";
pub(crate) const HEADER_RATELIMIT_LIMIT: &str = "ratelimit-limit";
pub(crate) const HEADER_RATELIMIT_REMAINING: &str = "ratelimit-remaining";
pub(crate) const HEADER_RATELIMIT_RESET: &str = "ratelimit-reset";

/// A response from the API.
///
/// The body is read in full by the transport and kept on the envelope, so
/// it can be inspected any number of times: [`Response::body`] exposes the
/// bytes, [`Response::body_reader`] returns a fresh reader on every call.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    /// Pagination and rate limit information.
    pub meta: Meta,
}

impl Response {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            meta: Meta::default(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[cfg(test)]
    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The full response body as sent by the server.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// A reader over the body, starting at the first byte.
    pub fn body_reader(&self) -> impl std::io::Read {
        self.body.clone().reader()
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns whether the response has a non-empty JSON body.
    pub fn has_json_body(&self) -> bool {
        !self.body.is_empty()
            && self
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("application/json"))
    }

    /// The unique id the API assigned to the request. Include it in
    /// support requests.
    pub fn correlation_id(&self) -> Option<&str> {
        self.headers
            .get(HEADER_CORRELATION_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn header_i64(&self, name: &str) -> i64 {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Meta information included in an API response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    /// Present only when the server sent pagination information.
    pub pagination: Option<Pagination>,
    pub rate_limit: RateLimit,
}

/// Pagination meta information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub previous_page: u32,
    /// `0` on the last page.
    #[serde(deserialize_with = "null_as_zero")]
    pub next_page: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub last_page: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub total_entries: u32,
}

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

/// Rate limit information from the `RateLimit-*` headers. Zero values mean
/// the header was missing or malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: i64,
    pub remaining: i64,
    /// Unix timestamp in seconds at which the limit resets.
    pub reset: i64,
}

impl RateLimit {
    /// The reset time, if the server reported one.
    pub fn reset_at(&self) -> Option<SystemTime> {
        u64::try_from(self.reset)
            .ok()
            .filter(|secs| *secs > 0)
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::io::Read;

    fn json_response(body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        Response::new(StatusCode::OK, headers, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_body_reader_replays() {
        let resp = json_response(r#"{"server":{"id":1}}"#);

        for _ in 0..3 {
            let mut buf = String::new();
            resp.body_reader().read_to_string(&mut buf).unwrap();
            assert_eq!(buf, r#"{"server":{"id":1}}"#);
        }
        assert_eq!(resp.text(), r#"{"server":{"id":1}}"#);
    }

    #[test]
    fn test_has_json_body() {
        assert!(json_response("{}").has_json_body());
        assert!(!json_response("").has_json_body());

        let plain = Response::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"{}"));
        assert!(!plain.has_json_body());
    }

    #[test]
    fn test_correlation_id() {
        let mut resp = json_response("{}");
        assert_eq!(resp.correlation_id(), None);

        resp.headers
            .insert(HEADER_CORRELATION_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(resp.correlation_id(), Some("abc-123"));
    }

    #[test]
    fn test_pagination_null_fields() {
        let p: Pagination = serde_json::from_str(
            r#"{"page":2,"per_page":25,"previous_page":1,"next_page":null,"last_page":2,"total_entries":40}"#,
        )
        .unwrap();
        assert_eq!(p.page, 2);
        assert_eq!(p.previous_page, 1);
        assert_eq!(p.next_page, 0);
        assert_eq!(p.total_entries, 40);
    }

    #[test]
    fn test_rate_limit_reset_at() {
        assert_eq!(RateLimit::default().reset_at(), None);
        let rl = RateLimit {
            limit: 3600,
            remaining: 3599,
            reset: 1_700_000_000,
        };
        assert_eq!(
            rl.reset_at(),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }
}
