use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "relay_messages_fetched_total",
            "Messages parsed from sources, before dedup."
        );
        describe_counter!(
            "relay_messages_delivered_total",
            "New messages accepted by at least one sink of a relay."
        );
        describe_counter!(
            "relay_messages_marked_seen_total",
            "New messages appended to a relay ledger, delivered or not."
        );
        describe_counter!(
            "relay_duplicates_total",
            "Fetched messages skipped because the ledger already has them."
        );
        describe_counter!(
            "relay_delivery_errors_total",
            "Failed sink deliveries."
        );
        describe_counter!(
            "relay_fetch_errors_total",
            "Source fetches that abandoned a relay cycle."
        );
        describe_counter!(
            "relay_malformed_posts_total",
            "Post elements skipped for missing text or time."
        );
        describe_histogram!("relay_cycle_ms", "Relay cycle duration in milliseconds.");
        describe_histogram!("relay_parse_ms", "Channel page parse time in milliseconds.");
        describe_gauge!(
            "relay_last_cycle_ts",
            "Unix ts when a relay last completed a cycle."
        );
    });
}

/// Install the Prometheus recorder and serve it on `addr`.
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
