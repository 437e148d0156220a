//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chain_reaction_initializations_total` (counter): session initializations by network, outcome
//! - `chain_reaction_transfers_total` (counter): transfers by network, outcome
//! - `chain_reaction_poll_attempts_total` (counter): receipt queries by network
//! - `chain_reaction_confirmation_seconds` (histogram): submit-to-receipt latency
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_initialization(network: &str, ok: bool) {
    counter!(
        "chain_reaction_initializations_total",
        "network" => network.to_string(),
        "outcome" => outcome(ok)
    )
    .increment(1);
}

/// Record a finished transfer. `outcome` is `"success"` or an error kind.
pub fn record_transfer(network: &str, outcome: &'static str) {
    counter!(
        "chain_reaction_transfers_total",
        "network" => network.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_poll_attempt(network: &str) {
    counter!("chain_reaction_poll_attempts_total", "network" => network.to_string()).increment(1);
}

pub fn record_confirmation_latency(network: &str, elapsed: Duration) {
    histogram!("chain_reaction_confirmation_seconds", "network" => network.to_string())
        .record(elapsed.as_secs_f64());
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}
