// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Handler;
use crate::client::{Request, Response};
use crate::error::Result;
use http::{header, HeaderMap};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Destination for request and response dumps.
pub type DebugSink = Arc<Mutex<dyn Write + Send>>;

/// Writes a dump of every request and response to the debug sink.
///
/// Without a sink the handler passes straight through. The body is the
/// cached copy, so dumping it does not consume anything the layers above
/// still need.
pub(crate) struct DebugHandler<H> {
    next: H,
    sink: Option<DebugSink>,
    host: String,
}

impl<H: Handler> DebugHandler<H> {
    pub(crate) fn new(next: H, sink: Option<DebugSink>, endpoint: String) -> Self {
        let host = url::Url::parse(&endpoint)
            .ok()
            .and_then(|url| {
                url.host_str().map(|host| match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                })
            })
            .unwrap_or(endpoint);
        Self { next, sink, host }
    }

    fn write(&self, sink: &DebugSink, dump: &str) {
        let result = match sink.lock() {
            Ok(mut writer) => writer
                .write_all(dump.as_bytes())
                .and_then(|()| writer.flush()),
            Err(_) => return warn!("debug sink poisoned, dropping dump"),
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to write debug dump");
        }
    }
}

impl<H: Handler> Handler for DebugHandler<H> {
    async fn handle(&self, req: Request) -> Result<Response> {
        let Some(sink) = &self.sink else {
            return self.next.handle(req).await;
        };

        self.write(sink, &dump_request(&req, &self.host));
        let resp = self.next.handle(req).await?;
        self.write(sink, &dump_response(&resp));
        Ok(resp)
    }
}

fn dump_request(req: &Request, host: &str) -> String {
    let mut out = format!(
        "--- Request:\n{} {} HTTP/1.1\r\nHost: {host}\r\n",
        req.method(),
        req.path()
    );
    push_headers(&mut out, req.headers());
    out.push_str("\r\n");
    if let Some(body) = req.body() {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out.push_str("\n\n");
    out
}

fn dump_response(resp: &Response) -> String {
    let mut out = format!("--- Response:\nHTTP/1.1 {}\r\n", resp.status());
    push_headers(&mut out, resp.headers());
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(resp.body()));
    out.push_str("\n\n");
    out
}

fn push_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let value = if name == header::AUTHORIZATION {
            "REDACTED".into()
        } else {
            String::from_utf8_lossy(value.as_bytes())
        };
        out.push_str(&canonical_name(name.as_str()));
        out.push_str(": ");
        out.push_str(&value);
        out.push_str("\r\n");
    }
}

/// `content-type` -> `Content-Type`
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestContext;
    use crate::handler::testing::{json_response, request, Scripted};
    use http::HeaderValue;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("x-correlation-id"), "X-Correlation-Id");
        assert_eq!(canonical_name("authorization"), "Authorization");
    }

    #[tokio::test]
    async fn test_dump_redacts_authorization() {
        let buf = SharedBuf::default();
        let sink: DebugSink = Arc::new(Mutex::new(buf.clone()));
        let inner = Scripted::new(|_| Ok(json_response(200, r#"{"server":{"id":1}}"#)));
        let handler = DebugHandler::new(
            inner,
            Some(sink),
            "https://api.hetzner.cloud/v1".to_string(),
        );

        let mut req = request(RequestContext::new());
        req.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer secret-token"),
        );
        let resp = handler.handle(req).await.unwrap();
        assert_eq!(resp.body().as_ref(), br#"{"server":{"id":1}}"#);

        let dump = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(dump.starts_with("--- Request:\nGET /servers/1 HTTP/1.1\r\n"));
        assert!(dump.contains("Host: api.hetzner.cloud\r\n"));
        assert!(dump.contains("Authorization: REDACTED\r\n"));
        assert!(!dump.contains("secret-token"));
        assert!(dump.contains("--- Response:\nHTTP/1.1 200 OK\r\n"));
        assert!(dump.contains("Content-Type: application/json\r\n"));
        assert!(dump.contains(r#"{"server":{"id":1}}"#));
    }

    #[tokio::test]
    async fn test_without_sink_passes_through() {
        let inner = Scripted::new(|_| Ok(json_response(204, "")));
        let handler = DebugHandler::new(inner, None, "http://127.0.0.1:1".to_string());
        let resp = handler.handle(request(RequestContext::new())).await.unwrap();
        assert_eq!(resp.status().as_u16(), 204);
        assert_eq!(handler.next.calls(), 1);
    }
}
