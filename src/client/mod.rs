// SPDX-License-Identifier: MIT OR Apache-2.0

//! The API client and its configuration.

mod request;
mod response;


pub use crate::handler::DebugSink;
pub use request::{Request, RequestContext};
pub use response::{Meta, Pagination, RateLimit, Response};

pub(crate) use response::{
    HEADER_RATELIMIT_LIMIT, HEADER_RATELIMIT_REMAINING, HEADER_RATELIMIT_RESET,
};

use crate::error::{HcloudError, Result};
use crate::handler::{self, Chain, ChainParts, Handler};
use crate::resources::{ActionClient, ServerClient, SshKeyClient};
use crate::runtime::{BackoffStrategy, ConstantBackoff, MetricsCollector, RetryConfig};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method};
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// The default endpoint of the Hetzner Cloud API.
pub const ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// The library's own User-Agent token.
pub const USER_AGENT: &str = concat!("hcloud-rs/", env!("CARGO_PKG_VERSION"));

/// Delay between polls while waiting for an action.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing slash.
    pub endpoint: String,
    /// API token sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    /// Prepended to the User-Agent as `name/version`.
    pub application_name: Option<String>,
    pub application_version: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: ENDPOINT.to_string(),
            token: None,
            application_name: None,
            application_version: None,
        }
    }
}

/// Backoff and retry limit for failed requests. The retry policy itself is
/// left untouched.
#[derive(Clone)]
pub struct RetryOpts {
    /// `None` keeps the current backoff.
    pub backoff: Option<Arc<dyn BackoffStrategy>>,
    pub max_retries: u32,
}

impl Default for RetryOpts {
    fn default() -> Self {
        Self {
            backoff: None,
            max_retries: RetryConfig::default().max_retries,
        }
    }
}

impl fmt::Debug for RetryOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOpts")
            .field("backoff", &self.backoff.as_ref().map(|_| "<backoff>"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Backoff between polls while waiting for actions.
#[derive(Clone, Default)]
pub struct PollOpts {
    /// `None` polls at a constant 500ms.
    pub backoff: Option<Arc<dyn BackoffStrategy>>,
}

/// Builder for [`Client`].
///
/// # Example
///
/// ```
/// use hcloud::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .token("my-token")
///     .application("my-tool", "1.0.0")
///     .poll_interval(Duration::from_secs(1))
///     .build()
///     .unwrap();
/// assert_eq!(client.endpoint(), "https://api.hetzner.cloud/v1");
/// ```
#[must_use]
pub struct ClientBuilder {
    config: ClientConfig,
    retry: RetryConfig,
    poll_backoff: Option<Arc<dyn BackoffStrategy>>,
    debug: Option<DebugSink>,
    http: Option<reqwest::Client>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            retry: RetryConfig::default(),
            poll_backoff: None,
            debug: None,
            http: None,
            metrics: None,
        }
    }

    /// Replace the whole connection configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Replace the retry policy, backoff and limit at once.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_opts(mut self, opts: RetryOpts) -> Self {
        if let Some(backoff) = opts.backoff {
            self.retry.backoff = backoff;
        }
        self.retry.max_retries = opts.max_retries;
        self
    }

    pub fn poll_opts(mut self, opts: PollOpts) -> Self {
        self.poll_backoff = opts.backoff;
        self
    }

    /// Poll at a constant interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        let backoff: Arc<dyn BackoffStrategy> = Arc::new(ConstantBackoff::new(interval));
        self.poll_backoff = Some(backoff);
        self
    }

    /// Identify the calling application in the User-Agent. An empty
    /// version is left out.
    pub fn application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        let version = version.into();
        self.config.application_name = Some(name.into());
        self.config.application_version = (!version.is_empty()).then_some(version);
        self
    }

    /// Dump every request and response to `writer`. The `Authorization`
    /// header is redacted.
    pub fn debug_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        let sink: DebugSink = Arc::new(Mutex::new(writer));
        self.debug = Some(sink);
        self
    }

    /// Use a preconfigured HTTP client, e.g. for proxies or timeouts.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Record request metrics into `collector`.
    pub fn instrumentation(mut self, collector: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(collector);
        self
    }

    pub fn build(self) -> Result<Client> {
        let endpoint = self.config.endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&endpoint)
            .map_err(|e| HcloudError::Config(format!("invalid endpoint {endpoint:?}: {e}")))?;

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .build()
                .map_err(|e| HcloudError::Config(format!("failed to build HTTP client: {e}")))?,
        };

        let user_agent = match (
            &self.config.application_name,
            &self.config.application_version,
        ) {
            (Some(name), Some(version)) => format!("{name}/{version} {USER_AGENT}"),
            (Some(name), None) => format!("{name} {USER_AGENT}"),
            _ => USER_AGENT.to_string(),
        };

        debug!(
            endpoint = %endpoint,
            max_retries = self.retry.max_retries,
            debug = self.debug.is_some(),
            "building client"
        );

        let chain = handler::assemble(ChainParts {
            http,
            endpoint: endpoint.clone(),
            retry: self.retry,
            debug: self.debug,
            metrics: self.metrics.clone(),
        });

        let poll_backoff = match self.poll_backoff {
            Some(backoff) => backoff,
            None => Arc::new(ConstantBackoff::new(DEFAULT_POLL_INTERVAL)),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                chain,
                endpoint,
                token: self.config.token,
                user_agent,
                poll_backoff,
                metrics: self.metrics,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the Hetzner Cloud API.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    chain: Chain,
    endpoint: String,
    token: Option<String>,
    user_agent: String,
    poll_backoff: Arc<dyn BackoffStrategy>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint)
            .field("user_agent", &self.inner.user_agent)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }

    /// The collector passed to [`ClientBuilder::instrumentation`].
    pub fn metrics(&self) -> Option<&Arc<MetricsCollector>> {
        self.inner.metrics.as_ref()
    }

    pub fn server(&self) -> ServerClient {
        ServerClient::new(self.clone())
    }

    pub fn ssh_key(&self) -> SshKeyClient {
        SshKeyClient::new(self.clone())
    }

    pub fn action(&self) -> ActionClient {
        ActionClient::new(self.clone())
    }

    /// Build a request for `path`, relative to the endpoint.
    ///
    /// The User-Agent and Authorization headers are set here, and the
    /// Content-Type when a body is present.
    pub fn new_request(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: impl Into<String>,
        body: Option<Bytes>,
    ) -> Result<Request> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.inner.user_agent)
                .map_err(|_| HcloudError::Config("User-Agent contains invalid characters".into()))?,
        );
        if let Some(token) = self.inner.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                HcloudError::Config("authorization token contains invalid characters".into())
            })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        if body.is_some() {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        Ok(Request {
            method,
            path: path.into(),
            headers,
            body,
            ctx: ctx.clone(),
        })
    }

    /// Send a request through the handler chain.
    pub async fn do_request(&self, req: Request) -> Result<Response> {
        let op = req.op_label();
        let method = req.method.clone();
        let path = req.path.clone();
        let resp = self.inner.chain.handle(req).await?;
        debug!(
            op_path = %op,
            method = %method,
            path = %path,
            status = resp.status().as_u16(),
            "request completed"
        );
        Ok(resp)
    }

    /// Send a request and decode the response body into `T`.
    pub async fn do_json<T: DeserializeOwned>(&self, req: Request) -> Result<(T, Response)> {
        let resp = self.do_request(req).await?;
        let value = handler::decode_json(&resp)?;
        Ok((value, resp))
    }

    /// Send a request and copy the response body into `writer`.
    pub async fn do_write<W: Write>(&self, req: Request, writer: &mut W) -> Result<Response> {
        let resp = self.do_request(req).await?;
        handler::write_body(&resp, writer)?;
        Ok(resp)
    }

    pub(crate) fn poll_backoff(&self) -> &dyn BackoffStrategy {
        self.inner.poll_backoff.as_ref()
    }
}
