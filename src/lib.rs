// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client library for the Hetzner Cloud API.
//!
//! Every request runs through a fixed pipeline that parses pagination
//! metadata, retries transient failures with backoff, turns error responses
//! into typed errors, records rate limit headers and optionally dumps the
//! exchange to a debug writer.
//!
//! ```no_run
//! use hcloud::{Client, RequestContext};
//!
//! # async fn run() -> hcloud::Result<()> {
//! let client = Client::builder().token("my-token").build()?;
//! let ctx = RequestContext::new();
//!
//! let (server, _resp) = client.server().get(&ctx, "web-1").await?;
//! if let Some(server) = server {
//!     let (action, _) = client.server().reboot(&ctx, &server).await?;
//!     client.action().wait_for(&ctx, &[action]).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
mod handler;
pub mod resources;
pub mod runtime;

pub use client::{
    Client, ClientBuilder, ClientConfig, Meta, Pagination, PollOpts, RateLimit, Request,
    RequestContext, Response, RetryOpts,
};
pub use error::{is_error, ApiError, ErrorCode, HcloudError, Result};
pub use resources::ListOpts;
pub use tokio_util::sync::CancellationToken;
