// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Handler;
use crate::client::{Pagination, Request, Response};
use crate::error::{HcloudError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Write;

/// Reads the `meta.pagination` object of successful JSON responses.
pub(crate) struct ParseHandler<H> {
    next: H,
}

#[derive(Deserialize)]
struct MetaEnvelope {
    #[serde(default)]
    meta: Option<MetaBody>,
}

#[derive(Deserialize)]
struct MetaBody {
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl<H: Handler> ParseHandler<H> {
    pub(crate) fn new(next: H) -> Self {
        Self { next }
    }
}

impl<H: Handler> Handler for ParseHandler<H> {
    async fn handle(&self, req: Request) -> Result<Response> {
        let mut resp = self.next.handle(req).await?;
        if !resp.has_json_body() {
            return Ok(resp);
        }

        let envelope: MetaEnvelope = decode_json(&resp)?;
        if let Some(pagination) = envelope.meta.and_then(|meta| meta.pagination) {
            resp.meta.pagination = Some(pagination);
        }
        Ok(resp)
    }
}

/// Decodes the cached body into `T`.
pub(crate) fn decode_json<T: DeserializeOwned>(resp: &Response) -> Result<T> {
    serde_json::from_slice(resp.body()).map_err(|source| HcloudError::Decode {
        source,
        response: Some(Box::new(resp.clone())),
    })
}

/// Copies the cached body into `writer`.
pub(crate) fn write_body<W: Write>(resp: &Response, writer: &mut W) -> Result<()> {
    writer.write_all(resp.body())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestContext;
    use crate::handler::testing::{json_response, request, Scripted};
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    async fn run(resp: Response) -> Result<Response> {
        let handler = ParseHandler::new(Scripted::new(move |_| Ok(resp.clone())));
        handler.handle(request(RequestContext::new())).await
    }

    #[tokio::test]
    async fn test_pagination_is_parsed() {
        let resp = run(json_response(
            200,
            r#"{"servers":[],"meta":{"pagination":{"page":2,"per_page":25,
                "previous_page":1,"next_page":3,"last_page":4,"total_entries":100}}}"#,
        ))
        .await
        .unwrap();

        let pagination = resp.meta.pagination.unwrap();
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.per_page, 25);
        assert_eq!(pagination.next_page, 3);
        assert_eq!(pagination.last_page, 4);
        assert_eq!(pagination.total_entries, 100);
    }

    #[tokio::test]
    async fn test_last_page_has_null_next() {
        let resp = run(json_response(
            200,
            r#"{"meta":{"pagination":{"page":4,"per_page":25,
                "previous_page":3,"next_page":null,"last_page":4,"total_entries":100}}}"#,
        ))
        .await
        .unwrap();
        assert_eq!(resp.meta.pagination.unwrap().next_page, 0);
    }

    #[tokio::test]
    async fn test_without_meta() {
        let resp = run(json_response(200, r#"{"server":{"id":1}}"#)).await.unwrap();
        assert!(resp.meta.pagination.is_none());
        // The body stays readable after parsing.
        assert_eq!(resp.text(), r#"{"server":{"id":1}}"#);
    }

    #[tokio::test]
    async fn test_non_json_body_is_ignored() {
        let resp = run(Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"not json"),
        ))
        .await
        .unwrap();
        assert!(resp.meta.pagination.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let err = run(json_response(200, "{\"meta\":")).await.unwrap_err();
        match err {
            HcloudError::Decode { response, .. } => {
                assert_eq!(response.unwrap().text(), "{\"meta\":");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_body_is_replayable() {
        let resp = json_response(200, r#"{"a":1}"#);
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_body(&resp, &mut first).unwrap();
        write_body(&resp, &mut second).unwrap();
        assert_eq!(first, second);

        let value: serde_json::Value = decode_json(&resp).unwrap();
        assert_eq!(value["a"], 1);
        let mut reader = resp.body_reader();
        let mut third = String::new();
        std::io::Read::read_to_string(&mut reader, &mut third).unwrap();
        assert_eq!(third, r#"{"a":1}"#);
    }
}
