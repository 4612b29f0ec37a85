// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed clients for API resources.
//!
//! Besides the resource clients this module holds the pieces they share:
//! list options, page iteration and the id-or-name lookup.

mod action;
mod server;
mod ssh_key;

pub use action::{
    Action, ActionClient, ActionErrorInfo, ActionListOpts, ActionResource, ActionStatus,
};
pub use server::{Server, ServerClient, ServerListOpts, ServerStatus, ServerUpdateOpts};
pub use ssh_key::{SshKey, SshKeyClient, SshKeyCreateOpts, SshKeyListOpts, SshKeyUpdateOpts};

use crate::client::{Client, RequestContext, Response};
use crate::error::{ErrorCode, HcloudError, Result};
use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Page size used when fetching every item of a list.
pub const ALL_PER_PAGE: u32 = 50;

/// A looked-up item together with the response that produced it. Both are
/// `None` when the lookup short-circuited without a request.
pub type Lookup<T> = (Option<T>, Option<Response>);

// =============================================================================
// List options
// =============================================================================

/// Options shared by every list endpoint. Zero and empty values are left out
/// of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOpts {
    /// 1-based page number.
    pub page: u32,
    /// Items per page; `0` uses the server default.
    pub per_page: u32,
    pub label_selector: String,
}

impl ListOpts {
    /// Query parameters for these options.
    pub fn values(&self) -> Vec<(&'static str, String)> {
        let mut values = Vec::new();
        if self.page > 0 {
            values.push(("page", self.page.to_string()));
        }
        if self.per_page > 0 {
            values.push(("per_page", self.per_page.to_string()));
        }
        if !self.label_selector.is_empty() {
            values.push(("label_selector", self.label_selector.clone()));
        }
        values
    }
}

/// `base?query`, or just `base` without parameters.
pub(crate) fn list_path(base: &str, values: &[(&'static str, String)]) -> String {
    if values.is_empty() {
        return base.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(values.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("{base}?{query}")
}

// =============================================================================
// Request helpers
// =============================================================================

pub(crate) async fn get_request<T: DeserializeOwned>(
    client: &Client,
    ctx: &RequestContext,
    path: String,
) -> Result<(T, Response)> {
    let req = client.new_request(ctx, Method::GET, path, None)?;
    client.do_json(req).await
}

pub(crate) async fn post_request<T: DeserializeOwned, B: Serialize>(
    client: &Client,
    ctx: &RequestContext,
    path: String,
    body: &B,
) -> Result<(T, Response)> {
    let body = serde_json::to_vec(body).map_err(HcloudError::Encode)?;
    let req = client.new_request(ctx, Method::POST, path, Some(Bytes::from(body)))?;
    client.do_json(req).await
}

/// POST without a request body, as used by resource actions.
pub(crate) async fn post_request_empty<T: DeserializeOwned>(
    client: &Client,
    ctx: &RequestContext,
    path: String,
) -> Result<(T, Response)> {
    let req = client.new_request(ctx, Method::POST, path, None)?;
    client.do_json(req).await
}

pub(crate) async fn put_request<T: DeserializeOwned, B: Serialize>(
    client: &Client,
    ctx: &RequestContext,
    path: String,
    body: &B,
) -> Result<(T, Response)> {
    let body = serde_json::to_vec(body).map_err(HcloudError::Encode)?;
    let req = client.new_request(ctx, Method::PUT, path, Some(Bytes::from(body)))?;
    client.do_json(req).await
}

pub(crate) async fn delete_request(
    client: &Client,
    ctx: &RequestContext,
    path: String,
) -> Result<Response> {
    let req = client.new_request(ctx, Method::DELETE, path, None)?;
    client.do_request(req).await
}

/// Turns a `not_found` API error into an empty lookup that still carries
/// the response.
pub(crate) fn not_found_as_none<T>(result: Result<(T, Response)>) -> Result<Lookup<T>> {
    match result {
        Ok((value, resp)) => Ok((Some(value), Some(resp))),
        Err(HcloudError::Api(err)) if err.code == ErrorCode::NotFound => {
            Ok((None, err.into_response()))
        }
        Err(err) => Err(err),
    }
}

// =============================================================================
// Pagination and lookup
// =============================================================================

/// Fetches every page, starting at page 1 and following `next_page` as
/// reported by the server, until pagination is missing or `next_page` is 0.
///
/// The first error is returned and the items collected so far are dropped.
///
/// ```no_run
/// # async fn demo(client: hcloud::Client) -> hcloud::Result<()> {
/// use hcloud::{RequestContext, resources::{iter_pages, ServerListOpts}};
///
/// let ctx = RequestContext::new();
/// let servers = client.server();
/// let all = iter_pages(|page| {
///     let mut opts = ServerListOpts::default();
///     opts.list_opts.page = page;
///     opts.list_opts.per_page = 25;
///     servers.list(&ctx, opts)
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn iter_pages<T, F, Fut>(mut list_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Response)>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let (items, resp) = list_page(page).await?;
        all.extend(items);
        match resp.meta.pagination {
            Some(pagination) if pagination.next_page != 0 => page = pagination.next_page,
            _ => return Ok(all),
        }
    }
}

/// Returns the first item of a name-filtered list. An empty name returns
/// nothing without sending a request.
pub async fn first_by_name<T, F, Fut>(name: &str, list: F) -> Result<Lookup<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Response)>>,
{
    if name.is_empty() {
        return Ok((None, None));
    }
    let (items, resp) = list().await?;
    Ok((items.into_iter().next(), Some(resp)))
}

/// Resolves an id-or-name string.
///
/// A string that parses as an integer is looked up by id first; when that
/// finds nothing, or the string is not numeric, it is looked up by name.
pub async fn get_by_id_or_name<'a, T, ById, ByIdFut, ByName, ByNameFut>(
    id_or_name: &'a str,
    by_id: ById,
    by_name: ByName,
) -> Result<Lookup<T>>
where
    ById: FnOnce(i64) -> ByIdFut,
    ByIdFut: Future<Output = Result<Lookup<T>>>,
    ByName: FnOnce(&'a str) -> ByNameFut,
    ByNameFut: Future<Output = Result<Lookup<T>>>,
{
    if let Ok(id) = id_or_name.parse::<i64>() {
        let (found, resp) = by_id(id).await?;
        if found.is_some() {
            return Ok((found, resp));
        }
    }
    by_name(id_or_name).await
}
