//! Prometheus metrics for the gateway.
//!
//! [`GatewayMetrics`] owns a dedicated [`Registry`] which the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

pub struct GatewayMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Sessions committed to the store, confirmed or local.
    pub sessions_created: IntCounter,
    pub votes_accepted: IntCounter,
    /// Votes refused by the vote protocol (any check).
    pub votes_rejected: IntCounter,
    /// Read-model updates merged into the store.
    pub sync_updates: IntCounter,
    /// Failed ledger calls and event publishes.
    pub upstream_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub session_count: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Duration of one status sweep over all sessions, in milliseconds.
    pub status_sweep_ms: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_created = register_int_counter_with_registry!(
            Opts::new("votegate_sessions_created_total", "Total sessions created"),
            registry
        )
        .expect("failed to register sessions_created counter");

        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("votegate_votes_accepted_total", "Total votes accepted"),
            registry
        )
        .expect("failed to register votes_accepted counter");

        let votes_rejected = register_int_counter_with_registry!(
            Opts::new("votegate_votes_rejected_total", "Total votes rejected"),
            registry
        )
        .expect("failed to register votes_rejected counter");

        let sync_updates = register_int_counter_with_registry!(
            Opts::new(
                "votegate_sync_updates_total",
                "Total read-model updates applied"
            ),
            registry
        )
        .expect("failed to register sync_updates counter");

        let upstream_failures = register_int_counter_with_registry!(
            Opts::new(
                "votegate_upstream_failures_total",
                "Total failed ledger calls and event publishes"
            ),
            registry
        )
        .expect("failed to register upstream_failures counter");

        let session_count = register_int_gauge_with_registry!(
            Opts::new("votegate_session_count", "Current number of sessions"),
            registry
        )
        .expect("failed to register session_count gauge");

        // 0.01 ms → ~160 ms
        let status_sweep_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "votegate_status_sweep_ms",
                "Status sweep duration in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.01, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register status_sweep_ms histogram");

        Self {
            registry,
            sessions_created,
            votes_accepted,
            votes_rejected,
            sync_updates,
            upstream_failures,
            session_count,
            status_sweep_ms,
        }
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = GatewayMetrics::new();
        metrics.votes_accepted.inc();
        metrics.session_count.set(4);
        metrics.status_sweep_ms.observe(0.5);

        let text = metrics.encode().unwrap();
        assert!(text.contains("votegate_votes_accepted_total 1"));
        assert!(text.contains("votegate_session_count 4"));
        assert!(text.contains("votegate_status_sweep_ms_count 1"));
    }

    #[test]
    fn instances_do_not_share_a_registry() {
        let a = GatewayMetrics::new();
        let b = GatewayMetrics::new();
        a.sessions_created.inc();
        assert_eq!(b.sessions_created.get(), 0);
    }
}
