//! Prometheus metrics for the resolver.
//!
//! All metrics are aggregated in the [`Metrics`] struct for easy tracking and management.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Aggregated metrics for the resolver.
///
/// Metrics are registered with the global metrics registry on creation. Without
/// an installed exporter every call is a no-op.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        // Cycle metrics
        describe_counter!(
            "resolver_cycles_total",
            "Total number of resolver cycles executed"
        );
        describe_counter!(
            "resolver_cycles_success_total",
            "Total number of resolver cycles that listed claims successfully"
        );
        describe_counter!(
            "resolver_cycles_failure_total",
            "Total number of resolver cycles that could not list claims"
        );
        describe_histogram!(
            "resolver_cycle_duration_seconds",
            "Duration of each resolver cycle in seconds"
        );

        // Per-claim step metrics
        describe_counter!(
            "resolver_step_outcomes_total",
            "Per-claim step outcomes by outcome"
        );
        describe_counter!(
            "resolver_stage_failure_total",
            "Failed pipeline stages by stage and error kind"
        );

        // Attestation metrics
        describe_counter!(
            "resolver_attestations_submitted_total",
            "Total number of attestation requests submitted"
        );
        describe_counter!(
            "resolver_attestation_fees_wei_total",
            "Total attestation fees paid in wei"
        );

        // Proof metrics
        describe_counter!(
            "resolver_proofs_accepted_total",
            "Total number of proofs accepted by the ClaimBoard"
        );
        describe_counter!(
            "resolver_proofs_rejected_total",
            "Total number of proofs rejected, by rejection kind"
        );

        describe_gauge!(
            "resolver_tracked_claims",
            "Number of tracked claims by tracker state"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Cycle metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record a completed cycle.
    pub fn record_cycle(&self, success: bool, duration: Duration) {
        counter!("resolver_cycles_total").increment(1);
        histogram!("resolver_cycle_duration_seconds").record(duration.as_secs_f64());

        if success {
            counter!("resolver_cycles_success_total").increment(1);
        } else {
            counter!("resolver_cycles_failure_total").increment(1);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Step metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn record_outcome(&self, outcome: &'static str) {
        counter!("resolver_step_outcomes_total", "outcome" => outcome).increment(1);
    }

    /// Record a failed stage with the error's kind label.
    pub fn record_stage_failure(&self, stage: &'static str, kind: &'static str) {
        counter!("resolver_stage_failure_total", "stage" => stage, "kind" => kind).increment(1);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Attestation and proof metrics
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn record_attestation_submitted(&self, fee_wei: u64) {
        counter!("resolver_attestations_submitted_total").increment(1);
        counter!("resolver_attestation_fees_wei_total").increment(fee_wei);
    }

    pub fn record_proof_accepted(&self) {
        counter!("resolver_proofs_accepted_total").increment(1);
    }

    pub fn record_proof_rejected(&self, kind: &str) {
        counter!("resolver_proofs_rejected_total", "kind" => kind.to_string()).increment(1);
    }

    /// Set the count of tracked claims by tracker state.
    pub fn set_tracked_claims(&self, state: &str, count: usize) {
        gauge!("resolver_tracked_claims", "state" => state.to_string()).set(count as f64);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
