//! Observability infrastructure for the metrics agent
//!
//! Provides:
//! - Prometheus metrics (fetch latency, cycle outcomes, cache size)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::gather::CycleSummary;

/// Histogram buckets for agent API calls and gather cycles (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    containers_fetch_latency_seconds: Histogram,
    state_fetch_latency_seconds: Histogram,
    cycle_duration_seconds: Histogram,
    gather_cycles: IntCounter,
    gather_cycle_errors: IntCounter,
    state_refreshes: IntCounter,
    state_refresh_errors: IntCounter,
    points_emitted: IntCounter,
    unmatched_containers: IntCounter,
    containers_live: IntGauge,
    cache_entries: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            containers_fetch_latency_seconds: register_histogram!(
                "mesos_metrics_agent_containers_fetch_latency_seconds",
                "Time spent on GET_CONTAINERS calls to the mesos agent",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register containers_fetch_latency_seconds"),

            state_fetch_latency_seconds: register_histogram!(
                "mesos_metrics_agent_state_fetch_latency_seconds",
                "Time spent on GET_STATE calls to the mesos agent",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register state_fetch_latency_seconds"),

            cycle_duration_seconds: register_histogram!(
                "mesos_metrics_agent_cycle_duration_seconds",
                "Wall-clock duration of complete gather cycles",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            gather_cycles: register_int_counter!(
                "mesos_metrics_agent_gather_cycles_total",
                "Total number of completed gather cycles"
            )
            .expect("Failed to register gather_cycles"),

            gather_cycle_errors: register_int_counter!(
                "mesos_metrics_agent_gather_cycle_errors_total",
                "Total number of gather cycles aborted by a failed container listing"
            )
            .expect("Failed to register gather_cycle_errors"),

            state_refreshes: register_int_counter!(
                "mesos_metrics_agent_state_refreshes_total",
                "Total number of GET_STATE refreshes issued"
            )
            .expect("Failed to register state_refreshes"),

            state_refresh_errors: register_int_counter!(
                "mesos_metrics_agent_state_refresh_errors_total",
                "Total number of GET_STATE refreshes that failed"
            )
            .expect("Failed to register state_refresh_errors"),

            points_emitted: register_int_counter!(
                "mesos_metrics_agent_points_emitted_total",
                "Total number of container metric points emitted"
            )
            .expect("Failed to register points_emitted"),

            unmatched_containers: register_int_counter!(
                "mesos_metrics_agent_unmatched_containers_total",
                "Total number of live containers skipped for lack of metadata"
            )
            .expect("Failed to register unmatched_containers"),

            containers_live: register_int_gauge!(
                "mesos_metrics_agent_containers_live",
                "Number of live containers reported by the last cycle"
            )
            .expect("Failed to register containers_live"),

            cache_entries: register_int_gauge!(
                "mesos_metrics_agent_cache_entries",
                "Number of records in the metadata cache"
            )
            .expect("Failed to register cache_entries"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record the latency of a GET_CONTAINERS call
    pub fn observe_containers_fetch(&self, duration_secs: f64) {
        self.inner()
            .containers_fetch_latency_seconds
            .observe(duration_secs);
    }

    /// Record the latency of a GET_STATE call
    pub fn observe_state_fetch(&self, duration_secs: f64) {
        self.inner().state_fetch_latency_seconds.observe(duration_secs);
    }

    /// Record the wall-clock duration of a whole gather cycle
    pub fn observe_cycle_duration(&self, duration_secs: f64) {
        self.inner().cycle_duration_seconds.observe(duration_secs);
    }

    pub fn inc_gather_cycles(&self) {
        self.inner().gather_cycles.inc();
    }

    pub fn inc_gather_cycle_errors(&self) {
        self.inner().gather_cycle_errors.inc();
    }

    pub fn inc_state_refreshes(&self) {
        self.inner().state_refreshes.inc();
    }

    pub fn inc_state_refresh_errors(&self) {
        self.inner().state_refresh_errors.inc();
    }

    pub fn add_points_emitted(&self, count: u64) {
        self.inner().points_emitted.inc_by(count);
    }

    pub fn add_unmatched_containers(&self, count: u64) {
        self.inner().unmatched_containers.inc_by(count);
    }

    /// Update live container and cache size gauges
    pub fn set_cache_sizes(&self, live: i64, cached: i64) {
        self.inner().containers_live.set(live);
        self.inner().cache_entries.set(cached);
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for cycle outcomes and
/// lifecycle events, keyed by the mesos agent this process watches.
#[derive(Clone)]
pub struct StructuredLogger {
    agent_url: String,
}

impl StructuredLogger {
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "agent_started",
            mesos_agent = %self.agent_url,
            agent_version = %version,
            "Metrics agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            mesos_agent = %self.agent_url,
            reason = %reason,
            "Metrics agent shutting down"
        );
    }

    /// Log the outcome of a completed gather cycle
    pub fn log_cycle(&self, summary: &CycleSummary) {
        debug!(
            event = "gather_cycle",
            mesos_agent = %self.agent_url,
            live_containers = summary.live_containers,
            pruned = summary.pruned,
            state_refreshed = summary.state_refreshed,
            state_refresh_failed = summary.state_refresh_failed,
            reconciled = summary.reconciled,
            emitted = summary.emitted,
            unmatched = summary.unmatched,
            missing_statistics = summary.missing_statistics,
            "Gather cycle complete"
        );
    }

    /// Log a gather cycle aborted by a failed container listing
    pub fn log_cycle_failure(&self, error: &dyn std::fmt::Display) {
        warn!(
            event = "gather_cycle_failed",
            mesos_agent = %self.agent_url,
            error = %error,
            "Gather cycle failed"
        );
    }
}
