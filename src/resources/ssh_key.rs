// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSH keys.

use super::{
    delete_request, first_by_name, get_by_id_or_name, get_request, iter_pages, list_path,
    not_found_as_none, post_request, put_request, ListOpts, Lookup, ALL_PER_PAGE,
};
use crate::client::{Client, RequestContext, Response};
use crate::error::{invalid_argument, missing_field, ArgumentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const OP_GET: &str = "/ssh_keys/%d";
const OP_LIST: &str = "/ssh_keys?%s";
const OP_CREATE: &str = "/ssh_keys";
const OP_UPDATE: &str = "/ssh_keys/%d";
const OP_DELETE: &str = "/ssh_keys/%d";

/// An SSH key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SshKey {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshKeyListOpts {
    pub list_opts: ListOpts,
    pub name: String,
    pub fingerprint: String,
    pub sort: Vec<String>,
}

impl SshKeyListOpts {
    pub fn values(&self) -> Vec<(&'static str, String)> {
        let mut values = self.list_opts.values();
        if !self.name.is_empty() {
            values.push(("name", self.name.clone()));
        }
        if !self.fingerprint.is_empty() {
            values.push(("fingerprint", self.fingerprint.clone()));
        }
        for sort in &self.sort {
            values.push(("sort", sort.clone()));
        }
        values
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshKeyCreateOpts {
    pub name: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

impl SshKeyCreateOpts {
    /// Checks that the required fields are set.
    pub fn validate(&self) -> std::result::Result<(), ArgumentError> {
        if self.name.is_empty() {
            return Err(missing_field(self, "name"));
        }
        if self.public_key.is_empty() {
            return Err(missing_field(self, "public_key"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshKeyUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct SshKeyBody {
    ssh_key: SshKey,
}

#[derive(Deserialize)]
struct SshKeyListBody {
    ssh_keys: Vec<SshKey>,
}

/// Client for the SSH key endpoints.
#[derive(Debug, Clone)]
pub struct SshKeyClient {
    client: Client,
}

impl SshKeyClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Retrieves an SSH key by its id. A key that does not exist is `None`,
    /// not an error.
    pub async fn get_by_id(&self, ctx: &RequestContext, id: i64) -> Result<Lookup<SshKey>> {
        let ctx = ctx.clone().with_op_path(OP_GET);
        let result = get_request::<SshKeyBody>(&self.client, &ctx, format!("/ssh_keys/{id}")).await;
        let (body, resp) = not_found_as_none(result)?;
        Ok((body.map(|body| body.ssh_key), resp))
    }

    pub async fn get_by_name(&self, ctx: &RequestContext, name: &str) -> Result<Lookup<SshKey>> {
        first_by_name(name, || {
            self.list(
                ctx,
                SshKeyListOpts {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
        })
        .await
    }

    pub async fn get_by_fingerprint(
        &self,
        ctx: &RequestContext,
        fingerprint: &str,
    ) -> Result<Lookup<SshKey>> {
        first_by_name(fingerprint, || {
            self.list(
                ctx,
                SshKeyListOpts {
                    fingerprint: fingerprint.to_string(),
                    ..Default::default()
                },
            )
        })
        .await
    }

    /// Retrieves an SSH key by id if `id_or_name` is numeric, falling back
    /// to a lookup by name.
    pub async fn get(&self, ctx: &RequestContext, id_or_name: &str) -> Result<Lookup<SshKey>> {
        get_by_id_or_name(
            id_or_name,
            |id| self.get_by_id(ctx, id),
            |name| self.get_by_name(ctx, name),
        )
        .await
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        opts: SshKeyListOpts,
    ) -> Result<(Vec<SshKey>, Response)> {
        let ctx = ctx.clone().with_op_path(OP_LIST);
        let path = list_path("/ssh_keys", &opts.values());
        let (body, resp) = get_request::<SshKeyListBody>(&self.client, &ctx, path).await?;
        Ok((body.ssh_keys, resp))
    }

    pub async fn all(&self, ctx: &RequestContext) -> Result<Vec<SshKey>> {
        let opts = SshKeyListOpts {
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
        opts: SshKeyListOpts,
    ) -> Result<Vec<SshKey>> {
        iter_pages(|page| {
            let mut opts = opts.clone();
            opts.list_opts.page = page;
            self.list(ctx, opts)
        })
        .await
    }

    /// Creates an SSH key. Invalid options fail before any request is sent.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        opts: &SshKeyCreateOpts,
    ) -> Result<(SshKey, Response)> {
        opts.validate()
            .map_err(|err| invalid_argument("opts", opts, err))?;

        let ctx = ctx.clone().with_op_path(OP_CREATE);
        let (body, resp) =
            post_request::<SshKeyBody, _>(&self.client, &ctx, "/ssh_keys".to_string(), opts)
                .await?;
        Ok((body.ssh_key, resp))
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        key: &SshKey,
        opts: &SshKeyUpdateOpts,
    ) -> Result<(SshKey, Response)> {
        let ctx = ctx.clone().with_op_path(OP_UPDATE);
        let path = format!("/ssh_keys/{}", key.id);
        let (body, resp) = put_request::<SshKeyBody, _>(&self.client, &ctx, path, opts).await?;
        Ok((body.ssh_key, resp))
    }

    pub async fn delete(&self, ctx: &RequestContext, key: &SshKey) -> Result<Response> {
        let ctx = ctx.clone().with_op_path(OP_DELETE);
        delete_request(&self.client, &ctx, format!("/ssh_keys/{}", key.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_opts_validate() {
        let opts = SshKeyCreateOpts {
            name: String::new(),
            public_key: "ssh-ed25519 AAAA".to_string(),
            labels: None,
        };
        let err = invalid_argument("opts", &opts, opts.validate().unwrap_err());
        assert_eq!(
            err.to_string(),
            "invalid argument 'opts' [SshKeyCreateOpts]: missing field [name] in [SshKeyCreateOpts]"
        );

        let opts = SshKeyCreateOpts {
            name: "laptop".to_string(),
            public_key: "ssh-ed25519 AAAA".to_string(),
            labels: None,
        };
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_list_opts_values() {
        let opts = SshKeyListOpts {
            fingerprint: "b7:2f:30:a0:2f:6c:58:6c:21:04:58:61:ba:06:3b:2f".to_string(),
            ..Default::default()
        };
        assert_eq!(
            list_path("/ssh_keys", &opts.values()),
            "/ssh_keys?fingerprint=b7%3A2f%3A30%3Aa0%3A2f%3A6c%3A58%3A6c%3A21%3A04%3A58%3A61%3Aba%3A06%3A3b%3A2f"
        );
    }
}
