//! One function per CLI subcommand
//!
//! Every function returns the exact text for stdout. Failures are logged
//! and collapsed here, and only here: `get` answers `0`, discovery answers
//! an empty `data` list, so an unreachable miner never looks like a broken
//! item to the monitoring server.

use colored::Colorize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::client::MinerClient;
use crate::config::Thresholds;
use crate::discovery::{discover, DiscoveryKind, DiscoveryMode, LldDocument};
use crate::metric::{Dialect, Metric};
use crate::report;

/// Printed for any failed `get`
pub const UNAVAILABLE: &str = "0";

/// `get`: the item's value, or `0`
pub async fn get(client: &MinerClient, item: &str, dialect: Dialect) -> String {
    // Reject bad paths before touching the network
    let metric = match Metric::parse(item, dialect) {
        Ok(metric) => metric,
        Err(e) => {
            error!("Path not found: {}: {}", item, e);
            return UNAVAILABLE.to_string();
        }
    };

    let doc = match client.fetch_status().await {
        Ok(doc) => doc,
        Err(e) => {
            error!("Error getting value: {}", e);
            return UNAVAILABLE.to_string();
        }
    };

    match metric.resolve(&doc) {
        Ok(value) => format_value(&value),
        Err(e) => {
            error!("Path not found: {}: {}", item, e);
            UNAVAILABLE.to_string()
        }
    }
}

/// `discover_chains` / `discover_fans`: LLD JSON, possibly with no entries
pub async fn discover_items(client: &MinerClient, kind: DiscoveryKind, mode: DiscoveryMode) -> String {
    let lld = match client.fetch_status().await {
        Ok(doc) => match discover(&doc, kind, mode) {
            Ok(entries) => LldDocument::new(kind, entries),
            Err(e) => {
                error!("Discovery of {:?} failed: {}", kind, e);
                LldDocument::empty(kind)
            }
        },
        Err(e) => {
            error!("Discovery of {:?} failed: {}", kind, e);
            LldDocument::empty(kind)
        }
    };

    serde_json::to_string(&lld).unwrap_or_else(|e| {
        error!("Failed to serialize discovery document: {}", e);
        r#"{"data":[]}"#.to_string()
    })
}

/// `status`: the colorized report, or a one-line diagnostic
pub async fn status(client: &MinerClient, thresholds: &Thresholds) -> String {
    let mut out = format!(
        "{}\nConnecting to miner at: {}\n",
        "Checking Antminer status...".cyan(),
        client.config().stats_url()
    );

    let rendered = match client.fetch_status().await {
        Ok(doc) => report::render_document(&doc, thresholds)
            .map_err(|e| format!("Unexpected status layout: {e}")),
        Err(e) => Err(format!("Connection error: {e}")),
    };

    match rendered {
        Ok(text) => out.push_str(&text),
        Err(message) => {
            error!("{}", message);
            out.push_str(&format!("{}\n", message.red()));
        }
    }
    out
}

/// `watch`: polls `item` forever, one line per cycle.
///
/// Each poll completes (or times out) before the next tick is considered,
/// so a slow miner never sees overlapping requests.
pub async fn watch(client: &MinerClient, item: &str, dialect: Dialect, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Watching {} on {} every {:?}", item, client.config().host, every);

    loop {
        ticker.tick().await;
        println!("{}", get(client, item, dialect).await);
    }
}

/// Strings print bare, everything else as JSON
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("S")), "S");
        assert_eq!(format_value(&json!(600)), "600");
        assert_eq!(format_value(&json!(60011.25)), "60011.25");
        assert_eq!(format_value(&json!(0)), UNAVAILABLE);
        assert_eq!(format_value(&json!([1, 2])), "[1,2]");
    }
}
