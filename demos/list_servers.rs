// SPDX-License-Identifier: MIT OR Apache-2.0

//! Example: list servers and look one up by name
//!
//! ```bash
//! HCLOUD_TOKEN=... cargo run --example list_servers -- web-1
//! ```

use hcloud::runtime::{ExponentialBackoff, ExponentialBackoffOpts, RetryConfig};
use hcloud::{Client, ErrorCode, RequestContext};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let retry = RetryConfig::builder()
        .max_retries(3)
        .backoff(ExponentialBackoff::with_opts(ExponentialBackoffOpts {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(10),
            ..Default::default()
        }))
        .build();

    let client = Client::builder()
        .token(std::env::var("HCLOUD_TOKEN").unwrap_or_default())
        .application("list-servers", env!("CARGO_PKG_VERSION"))
        .retry(retry)
        .build()?;
    let ctx = RequestContext::new().with_timeout(Duration::from_secs(60));

    // =========================================================================
    // All servers
    // =========================================================================
    match client.server().all(&ctx).await {
        Ok(servers) => {
            println!("{} server(s)", servers.len());
            for server in servers {
                println!("{:>10}  {:<30} {}", server.id, server.name, server.status);
            }
        }
        Err(err) if err.is_error(&[ErrorCode::Unauthorized]) => {
            eprintln!("token rejected, set HCLOUD_TOKEN");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    // =========================================================================
    // Lookup by id or name
    // =========================================================================
    if let Some(id_or_name) = std::env::args().nth(1) {
        let (server, resp) = client.server().get(&ctx, &id_or_name).await?;
        match server {
            Some(server) => println!("\n{id_or_name}: {server:#?}"),
            None => println!("\n{id_or_name}: not found"),
        }
        if let Some(resp) = resp {
            let rate_limit = resp.meta.rate_limit;
            println!("rate limit: {}/{}", rate_limit.remaining, rate_limit.limit);
        }
    }

    Ok(())
}
