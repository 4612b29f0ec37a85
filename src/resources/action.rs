// SPDX-License-Identifier: MIT OR Apache-2.0

//! Actions and waiting for them to finish.

use super::{get_request, iter_pages, list_path, not_found_as_none, ListOpts, Lookup, ALL_PER_PAGE};
use crate::client::{Client, RequestContext, Response};
use crate::error::{ActionError, HcloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

const OP_GET: &str = "/actions/%d";
const OP_LIST: &str = "/actions?%s";

/// A long-running operation started by another request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Action {
    pub id: i64,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub status: ActionStatus,
    /// Completion in percent.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub started: String,
    #[serde(default)]
    pub finished: Option<String>,
    /// Set when the action ended with status `error`.
    #[serde(default)]
    pub error: Option<ActionErrorInfo>,
    #[serde(default)]
    pub resources: Vec<ActionResource>,
}

impl Action {
    /// The failure of an action with status `error`.
    pub fn error(&self) -> Option<ActionError> {
        if self.status != ActionStatus::Error {
            return None;
        }
        let info = self.error.clone().unwrap_or_default();
        Some(ActionError {
            action_id: self.id,
            code: info.code,
            message: info.message,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionErrorInfo {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A resource an action operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionResource {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Running,
    Success,
    Error,
    /// A status this client does not know yet. Treated as still running.
    #[serde(other)]
    Unknown,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Running => "running",
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
            ActionStatus::Unknown => "unknown",
        }
    }

    /// Whether the action has reached `success` or `error`.
    pub fn is_finished(&self) -> bool {
        matches!(self, ActionStatus::Success | ActionStatus::Error)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionListOpts {
    pub list_opts: ListOpts,
    pub id: Vec<i64>,
    pub status: Vec<ActionStatus>,
    pub sort: Vec<String>,
}

impl ActionListOpts {
    pub fn values(&self) -> Vec<(&'static str, String)> {
        let mut values = self.list_opts.values();
        for id in &self.id {
            values.push(("id", id.to_string()));
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

#[derive(Deserialize)]
struct ActionBody {
    action: Action,
}

#[derive(Deserialize)]
struct ActionListBody {
    actions: Vec<Action>,
}

/// Client for the action endpoints.
#[derive(Debug, Clone)]
pub struct ActionClient {
    client: Client,
}

impl ActionClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Lookup<Action>> {
        let ctx = ctx.clone().with_op_path(OP_GET);
        let result = get_request::<ActionBody>(&self.client, &ctx, format!("/actions/{id}")).await;
        let (body, resp) = not_found_as_none(result)?;
        Ok((body.map(|body| body.action), resp))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        opts: ActionListOpts,
    ) -> Result<(Vec<Action>, Response)> {
        let ctx = ctx.clone().with_op_path(OP_LIST);
        let path = list_path("/actions", &opts.values());
        let (body, resp) = get_request::<ActionListBody>(&self.client, &ctx, path).await?;
        Ok((body.actions, resp))
    }

    pub async fn all(&self, ctx: &RequestContext) -> Result<Vec<Action>> {
        let opts = ActionListOpts {
            list_opts: ListOpts {
                per_page: ALL_PER_PAGE,
                ..Default::default()
            },
            ..Default::default()
        };
        self.all_with_opts(ctx, opts).await
    }

    pub async fn all_with_opts(
        &self,
        ctx: &RequestContext,
        opts: ActionListOpts,
    ) -> Result<Vec<Action>> {
        iter_pages(|page| {
            let mut opts = opts.clone();
            opts.list_opts.page = page;
            self.list(ctx, opts)
        })
        .await
    }

    /// Waits until every action has finished.
    ///
    /// Unfinished actions are polled with the client's poll backoff. The first
    /// action that ends with status `error` is returned as
    /// [`HcloudError::Action`]; the wait stops there.
    pub async fn wait_for(&self, ctx: &RequestContext, actions: &[Action]) -> Result<()> {
        let mut running = HashSet::new();
        for action in actions {
            check_finished(action)?;
            if !action.status.is_finished() {
                running.insert(action.id);
            }
        }

        let mut retries = 0;
        while !running.is_empty() {
            let delay = self.client.poll_backoff().delay(retries);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctx.done() => return Err(ctx.done_error(None)),
            }
            retries += 1;

            let mut ids: Vec<i64> = running.iter().copied().collect();
            ids.sort_unstable();
            let opts = ActionListOpts {
                list_opts: ListOpts {
                    per_page: ALL_PER_PAGE,
                    ..Default::default()
                },
                id: ids,
                ..Default::default()
            };
            let updates = self.all_with_opts(ctx, opts).await?;
            if updates.len() != running.len() {
                return Err(HcloudError::Unknown(format!(
                    "failed to wait for actions: expected {} actions, got {}",
                    running.len(),
                    updates.len()
                )));
            }

            for action in &updates {
                if !action.status.is_finished() {
                    continue;
                }
                running.remove(&action.id);
                check_finished(action)?;
            }
            debug!(retries, pending = running.len(), "polled actions");
        }
        Ok(())
    }
}

fn check_finished(action: &Action) -> Result<()> {
    match action.error() {
        Some(err) => {
            debug!(action_id = action.id, code = %err.code, "action failed");
            Err(HcloudError::Action(err))
        }
        None => Ok(()),
    }
}
