// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request metrics in the Prometheus text format.
//!
//! Attach a [`MetricsCollector`] with
//! [`ClientBuilder::instrumentation`](crate::ClientBuilder::instrumentation)
//! and every round trip (retries included) is counted and timed. Series are
//! keyed by HTTP method and operation path (the URL template, e.g.
//! `/servers/%d/actions/reboot`), never by the concrete URL, so resource
//! ids do not multiply them.
//!
//! ```rust
//! use hcloud::runtime::{MetricsCollector, MetricsConfig};
//! use std::time::Duration;
//!
//! let metrics = MetricsCollector::new(MetricsConfig {
//!     namespace: "hcloud".to_string(),
//!     ..Default::default()
//! });
//! metrics.record_request("GET", "/servers/%d", "200", Duration::from_millis(42));
//!
//! assert!(metrics.to_prometheus_text().contains("hcloud_requests_total"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Settings for a [`MetricsCollector`].
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Prefix of every metric name.
    pub namespace: String,
    /// Upper bounds of the duration histogram buckets, in seconds, ascending.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "hcloud_api".to_string(),
            duration_buckets: vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        }
    }
}

/// `(method, operation path)`
type SeriesKey = (String, String);

#[derive(Debug, Default)]
struct Series {
    by_code: BTreeMap<String, u64>,
    /// Non-cumulative counts, one per bucket bound.
    buckets: Vec<u64>,
    sum: Duration,
    count: u64,
}

/// Collects request counters and duration histograms for one or more clients.
#[derive(Debug)]
pub struct MetricsCollector {
    config: MetricsConfig,
    series: Mutex<BTreeMap<SeriesKey, Series>>,
}

impl MetricsCollector {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            series: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MetricsConfig::default())
    }

    /// Record one round trip.
    ///
    /// `code` is the HTTP status code, or `"error"` when no response was
    /// received.
    pub fn record_request(&self, method: &str, op_path: &str, code: &str, duration: Duration) {
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        let entry = series
            .entry((method.to_string(), op_path.to_string()))
            .or_default();

        *entry.by_code.entry(code.to_string()).or_default() += 1;

        if entry.buckets.is_empty() {
            entry.buckets = vec![0; self.config.duration_buckets.len()];
        }
        let secs = duration.as_secs_f64();
        if let Some(i) = self.config.duration_buckets.iter().position(|le| secs <= *le) {
            entry.buckets[i] += 1;
        }
        entry.sum += duration;
        entry.count += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.count_where(|_, _| true)
    }

    pub fn requests_with_code(&self, code: &str) -> u64 {
        self.count_where(|_, c| c == code)
    }

    /// Round trips recorded for an operation path, over all methods and codes.
    pub fn requests_for_endpoint(&self, op_path: &str) -> u64 {
        self.count_where(|key, _| key.1 == op_path)
    }

    fn count_where(&self, pred: impl Fn(&SeriesKey, &str) -> bool) -> u64 {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        series
            .iter()
            .flat_map(|(key, s)| s.by_code.iter().map(move |(code, n)| (key, code, n)))
            .filter(|(key, code, _)| pred(*key, code.as_str()))
            .map(|(_, _, n)| n)
            .sum()
    }

    /// Render all series in the Prometheus text exposition format.
    pub fn to_prometheus_text(&self) -> String {
        let ns = &self.config.namespace;
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = String::new();

        let _ = writeln!(out, "# HELP {ns}_requests_total Requests sent to the API.");
        let _ = writeln!(out, "# TYPE {ns}_requests_total counter");
        for ((method, op_path), s) in series.iter() {
            for (code, n) in &s.by_code {
                let labels = label_set(&[
                    ("method", method.as_str()),
                    ("api_endpoint", op_path.as_str()),
                    ("code", code.as_str()),
                ]);
                let _ = writeln!(out, "{ns}_requests_total{{{labels}}} {n}");
            }
        }

        let _ = writeln!(out, "# HELP {ns}_request_duration_seconds Round trip latency.");
        let _ = writeln!(out, "# TYPE {ns}_request_duration_seconds histogram");
        for ((method, op_path), s) in series.iter() {
            let base = [("method", method.as_str()), ("api_endpoint", op_path.as_str())];
            let mut cumulative = 0;
            for (le, n) in self.config.duration_buckets.iter().zip(&s.buckets) {
                cumulative += n;
                let le = le.to_string();
                let labels = label_set(&[base[0], base[1], ("le", le.as_str())]);
                let _ = writeln!(
                    out,
                    "{ns}_request_duration_seconds_bucket{{{labels}}} {cumulative}"
                );
            }
            let labels = label_set(&[base[0], base[1], ("le", "+Inf")]);
            let _ = writeln!(
                out,
                "{ns}_request_duration_seconds_bucket{{{labels}}} {}",
                s.count
            );

            let labels = label_set(&base);
            let _ = writeln!(
                out,
                "{ns}_request_duration_seconds_sum{{{labels}}} {}",
                s.sum.as_secs_f64()
            );
            let _ = writeln!(
                out,
                "{ns}_request_duration_seconds_count{{{labels}}} {}",
                s.count
            );
        }

        out
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn label_set(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            let value = value.replace('\\', "\\\\").replace('"', "\\\"");
            format!("{name}=\"{value}\"")
        })
        .collect::<Vec<_>>()
        .join(",")
}
