// SPDX-License-Identifier: MIT OR Apache-2.0

//! Example: request metrics in the Prometheus text format
//!
//! Every round trip, retries included, is recorded under its operation path.
//!
//! ```bash
//! HCLOUD_TOKEN=... cargo run --example metrics
//! ```

use hcloud::runtime::{MetricsCollector, MetricsConfig};
use hcloud::{Client, RequestContext};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = Arc::new(MetricsCollector::new(MetricsConfig {
        namespace: "hcloud".to_string(),
        ..Default::default()
    }));

    let client = Client::builder()
        .token(std::env::var("HCLOUD_TOKEN").unwrap_or_default())
        .instrumentation(metrics.clone())
        .build()?;
    let ctx = RequestContext::new();

    if let Err(err) = client.server().all(&ctx).await {
        eprintln!("listing servers failed: {err}");
    }
    if let Err(err) = client.ssh_key().all(&ctx).await {
        eprintln!("listing ssh keys failed: {err}");
    }
    if let Err(err) = client.server().get_by_id(&ctx, 1).await {
        eprintln!("fetching server 1 failed: {err}");
    }

    println!(
        "{} request(s), {} with status 200\n",
        metrics.total_requests(),
        metrics.requests_with_code("200")
    );
    print!("{}", metrics.to_prometheus_text());

    Ok(())
}
