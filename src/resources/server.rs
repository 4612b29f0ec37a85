// SPDX-License-Identifier: MIT OR Apache-2.0

//! Servers.

use super::{
    delete_request, first_by_name, get_by_id_or_name, get_request, iter_pages, list_path,
    not_found_as_none, post_request_empty, put_request, Action, ListOpts, Lookup, ALL_PER_PAGE,
};
use crate::client::{Client, RequestContext, Response};
use crate::error::Result;
use crate::handler::decode_json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const OP_GET: &str = "/servers/%d";
const OP_LIST: &str = "/servers?%s";
const OP_UPDATE: &str = "/servers/%d";
const OP_DELETE: &str = "/servers/%d";
const OP_POWERON: &str = "/servers/%d/actions/poweron";
const OP_POWEROFF: &str = "/servers/%d/actions/poweroff";
const OP_REBOOT: &str = "/servers/%d/actions/reboot";
const OP_RESET: &str = "/servers/%d/actions/reset";
const OP_SHUTDOWN: &str = "/servers/%d/actions/shutdown";

/// A server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Server {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ServerStatus,
    /// Creation time as RFC 3339 timestamp.
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub locked: bool,
}

/// Status of a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Initializing,
    Starting,
    Running,
    Stopping,
    Off,
    Deleting,
    Rebuilding,
    Migrating,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Initializing => "initializing",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Stopping => "stopping",
            ServerStatus::Off => "off",
            ServerStatus::Deleting => "deleting",
            ServerStatus::Rebuilding => "rebuilding",
            ServerStatus::Migrating => "migrating",
            ServerStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for listing servers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerListOpts {
    pub list_opts: ListOpts,
    pub name: String,
    pub status: Vec<ServerStatus>,
    /// Sort keys such as `name:asc`.
    pub sort: Vec<String>,
}

impl ServerListOpts {
    pub fn values(&self) -> Vec<(&'static str, String)> {
        let mut values = self.list_opts.values();
        if !self.name.is_empty() {
            values.push(("name", self.name.clone()));
        }
        for status in &self.status {
            values.push(("status", status.as_str().to_string()));
        }
        for sort in &self.sort {
            values.push(("sort", sort.clone()));
        }
        values
    }
}

/// Fields to change on a server. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct ServerBody {
    server: Server,
}

#[derive(Deserialize)]
struct ServerListBody {
    servers: Vec<Server>,
}

#[derive(Deserialize)]
struct ActionBody {
    action: Action,
}

/// Client for the server endpoints.
#[derive(Debug, Clone)]
pub struct ServerClient {
    client: Client,
}

impl ServerClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Retrieves a server by its id. A server that does not exist is
    /// `None`, not an error.
    pub async fn get_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Lookup<Server>> {
        let ctx = ctx.clone().with_op_path(OP_GET);
        let result = get_request::<ServerBody>(&self.client, &ctx, format!("/servers/{id}")).await;
        let (body, resp) = not_found_as_none(result)?;
        Ok((body.map(|body| body.server), resp))
    }

    /// Retrieves a server by its name.
    pub async fn get_by_name(&self, ctx: &RequestContext, name: &str) -> Result<Lookup<Server>> {
        first_by_name(name, || {
            self.list(
                ctx,
                ServerListOpts {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
        })
        .await
    }

    /// Retrieves a server by id if `id_or_name` is numeric, falling back to
    /// a lookup by name.
    pub async fn get(&self, ctx: &RequestContext, id_or_name: &str) -> Result<Lookup<Server>> {
        get_by_id_or_name(
            id_or_name,
            |id| self.get_by_id(ctx, id),
            |name| self.get_by_name(ctx, name),
        )
        .await
    }

    /// Returns a single page of servers.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        opts: ServerListOpts,
    ) -> Result<(Vec<Server>, Response)> {
        let ctx = ctx.clone().with_op_path(OP_LIST);
        let path = list_path("/servers", &opts.values());
        let (body, resp) = get_request::<ServerListBody>(&self.client, &ctx, path).await?;
        Ok((body.servers, resp))
    }

    /// Returns all servers.
    pub async fn all(&self, ctx: &RequestContext) -> Result<Vec<Server>> {
        let opts = ServerListOpts {
            list_opts: ListOpts {
                per_page: ALL_PER_PAGE,
                ..Default::default()
            },
            ..Default::default()
        };
        self.all_with_opts(ctx, opts).await
    }

    /// Returns all servers matching `opts`, walking every page.
    pub async fn all_with_opts(
        &self,
        ctx: &RequestContext,
        opts: ServerListOpts,
    ) -> Result<Vec<Server>> {
        iter_pages(|page| {
            let mut opts = opts.clone();
            opts.list_opts.page = page;
            self.list(ctx, opts)
        })
        .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        server: &Server,
        opts: &ServerUpdateOpts,
    ) -> Result<(Server, Response)> {
        let ctx = ctx.clone().with_op_path(OP_UPDATE);
        let path = format!("/servers/{}", server.id);
        let (body, resp) = put_request::<ServerBody, _>(&self.client, &ctx, path, opts).await?;
        Ok((body.server, resp))
    }

    /// Deletes a server and returns the action tracking the deletion.
    pub async fn delete(&self, ctx: &RequestContext, server: &Server) -> Result<(Action, Response)> {
        let ctx = ctx.clone().with_op_path(OP_DELETE);
        let resp = delete_request(&self.client, &ctx, format!("/servers/{}", server.id)).await?;
        let body: ActionBody = decode_json(&resp)?;
        Ok((body.action, resp))
    }

    pub async fn poweron(&self, ctx: &RequestContext, server: &Server) -> Result<(Action, Response)> {
        self.action(ctx, OP_POWERON, server, "poweron").await
    }

    /// Cuts power to a server. Unlike [`ServerClient::shutdown`] this does
    /// not give the operating system a chance to stop.
    pub async fn poweroff(&self, ctx: &RequestContext, server: &Server) -> Result<(Action, Response)> {
        self.action(ctx, OP_POWEROFF, server, "poweroff").await
    }

    /// Sends a soft reboot (ACPI) to a server.
    pub async fn reboot(&self, ctx: &RequestContext, server: &Server) -> Result<(Action, Response)> {
        self.action(ctx, OP_REBOOT, server, "reboot").await
    }

    /// Hard reset.
    pub async fn reset(&self, ctx: &RequestContext, server: &Server) -> Result<(Action, Response)> {
        self.action(ctx, OP_RESET, server, "reset").await
    }

    /// Sends a shutdown request (ACPI) to a server.
    pub async fn shutdown(&self, ctx: &RequestContext, server: &Server) -> Result<(Action, Response)> {
        self.action(ctx, OP_SHUTDOWN, server, "shutdown").await
    }

    async fn action(
        &self,
        ctx: &RequestContext,
        op_path: &'static str,
        server: &Server,
        name: &str,
    ) -> Result<(Action, Response)> {
        let ctx = ctx.clone().with_op_path(op_path);
        let path = format!("/servers/{}/actions/{name}", server.id);
        let (body, resp) = post_request_empty::<ActionBody>(&self.client, &ctx, path).await?;
        Ok((body.action, resp))
    }
}
