//! Periodic gather orchestration
//!
//! One gather cycle runs a fixed pipeline: list live containers, prune
//! dead cache records, repair the metadata cache when it is incomplete and
//! the rate limiter allows, then emit one tagged metric point per live
//! container. Cycles never overlap; ticks that land while a cycle is still
//! running are skipped.

mod emit;

pub use emit::{
    container_point, container_tags, statistics_fields, ChannelSink, FieldValue, MetricPoint,
    MetricSink, CONTAINERS_MEASUREMENT,
};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{AgentApi, AgentError};
use crate::health::{components, HealthRegistry};
use crate::metadata::MetadataCache;
use crate::observability::{AgentMetrics, StructuredLogger};

/// Configuration for the gather loop
#[derive(Debug, Clone)]
pub struct GatherConfig {
    /// Interval between gather cycles (default: 10 seconds)
    pub interval: Duration,
    /// Minimum spacing between GET_STATE refreshes (default: 60 seconds)
    pub min_state_interval: Duration,
    /// Channel buffer size for emitted metric points
    pub buffer_size: usize,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            min_state_interval: Duration::from_secs(60),
            buffer_size: 1000,
        }
    }
}

/// A gather cycle failed outright
#[derive(Debug, Error)]
pub enum CycleError {
    /// The live-container listing failed, so the cycle had nothing to act on
    #[error("container listing failed: {0}")]
    ContainersFetch(#[from] AgentError),
}

/// Counters describing what one gather cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Containers reported live by the agent
    pub live_containers: usize,
    /// Cache records dropped because their container went away
    pub pruned: usize,
    /// A state snapshot was fetched and reconciled this cycle
    pub state_refreshed: bool,
    /// A state fetch was attempted and failed this cycle
    pub state_refresh_failed: bool,
    /// Cache records created by reconciliation
    pub reconciled: usize,
    /// Metric points handed to the sink
    pub emitted: usize,
    /// Live containers skipped because no metadata record existed
    pub unmatched: usize,
    /// Live containers skipped because they carried no statistics
    pub missing_statistics: usize,
}

/// Runs gather cycles against one mesos agent
pub struct Gatherer {
    agent: Arc<dyn AgentApi>,
    cache: Arc<MetadataCache>,
    config: GatherConfig,
    metrics: AgentMetrics,
}

impl Gatherer {
    pub fn new(agent: Arc<dyn AgentApi>, cache: Arc<MetadataCache>, config: GatherConfig) -> Self {
        Self {
            agent,
            cache,
            config,
            metrics: AgentMetrics::new(),
        }
    }

    /// Run one gather cycle end to end.
    ///
    /// Only a failed container listing aborts the cycle. A failed or
    /// rate-limited state refresh degrades it instead: containers with
    /// cached metadata still emit, the rest are skipped and counted.
    pub async fn run_cycle(&self, sink: &dyn MetricSink) -> Result<CycleSummary, CycleError> {
        let cycle_start = Instant::now();

        let fetch_start = Instant::now();
        let containers = match self.agent.fetch_containers().await {
            Ok(containers) => {
                self.metrics
                    .observe_containers_fetch(fetch_start.elapsed().as_secs_f64());
                containers
            }
            Err(error) => {
                self.metrics.inc_gather_cycle_errors();
                return Err(CycleError::ContainersFetch(error));
            }
        };

        let live_ids: HashSet<String> = containers
            .iter()
            .map(|c| c.container_id.clone())
            .collect();

        let mut summary = CycleSummary {
            live_containers: containers.len(),
            ..Default::default()
        };

        summary.pruned = self.cache.prune(&live_ids).await;

        if !self.cache.is_consistent(&live_ids).await {
            if self
                .cache
                .begin_state_refresh(self.config.min_state_interval)
                .await
            {
                self.metrics.inc_state_refreshes();
                let state_start = Instant::now();
                match self.agent.fetch_state().await {
                    Ok(state) => {
                        self.metrics
                            .observe_state_fetch(state_start.elapsed().as_secs_f64());
                        summary.reconciled = self.cache.reconcile(&containers, &state).await;
                        summary.state_refreshed = true;
                    }
                    Err(error) => {
                        self.metrics.inc_state_refresh_errors();
                        summary.state_refresh_failed = true;
                        warn!(
                            error = %error,
                            "State fetch failed; emitting with cached metadata only"
                        );
                    }
                }
            } else {
                debug!("Metadata incomplete but state refresh is rate limited");
            }
        }

        for sample in &containers {
            match self.cache.get(&sample.container_id).await {
                Some(metadata) => match emit::container_point(sample, &metadata) {
                    Some(point) => {
                        sink.add(point);
                        summary.emitted += 1;
                    }
                    None => {
                        summary.missing_statistics += 1;
                        debug!(
                            container_id = %sample.container_id,
                            "Live container reported no statistics"
                        );
                    }
                },
                None => {
                    summary.unmatched += 1;
                    warn!(
                        container_id = %sample.container_id,
                        "No metadata for live container; skipping emission"
                    );
                }
            }
        }

        self.metrics.inc_gather_cycles();
        self.metrics.add_points_emitted(summary.emitted as u64);
        if summary.unmatched > 0 {
            self.metrics.add_unmatched_containers(summary.unmatched as u64);
        }
        self.metrics
            .set_cache_sizes(summary.live_containers as i64, self.cache.len().await as i64);
        self.metrics
            .observe_cycle_duration(cycle_start.elapsed().as_secs_f64());

        Ok(summary)
    }
}

/// Gather loop that runs cycles on a fixed interval until shut down
pub struct GatherLoop {
    gatherer: Arc<Gatherer>,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
    sink: ChannelSink,
    interval: Duration,
}

impl GatherLoop {
    /// Create the loop and the receiving end of its metric channel.
    pub fn new(
        gatherer: Arc<Gatherer>,
        logger: StructuredLogger,
    ) -> (Self, mpsc::Receiver<MetricPoint>) {
        let (points_tx, points_rx) = mpsc::channel(gatherer.config.buffer_size);
        let interval = gatherer.config.interval;

        let loop_instance = Self {
            gatherer,
            logger,
            health: None,
            sink: ChannelSink::new(points_tx),
            interval,
        };

        (loop_instance, points_rx)
    }

    /// Attach a health registry; the loop reports gatherer and mesos
    /// client status and flips readiness on the first successful cycle.
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Run cycles until the shutdown signal arrives.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting gather loop"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ready = false;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.gatherer.run_cycle(&self.sink).await {
                        Ok(summary) => {
                            self.logger.log_cycle(&summary);
                            if let Some(health) = &self.health {
                                if !ready {
                                    ready = true;
                                    health.set_ready(true).await;
                                }
                                health.set_healthy(components::GATHERER).await;
                                if summary.state_refresh_failed {
                                    health
                                        .set_degraded(
                                            components::MESOS_CLIENT,
                                            "State fetch failing",
                                        )
                                        .await;
                                } else {
                                    health.set_healthy(components::MESOS_CLIENT).await;
                                }
                            }
                        }
                        Err(error) => {
                            self.logger.log_cycle_failure(&error);
                            if let Some(health) = &self.health {
                                health
                                    .set_unhealthy(components::GATHERER, error.to_string())
                                    .await;
                                health
                                    .set_unhealthy(
                                        components::MESOS_CLIENT,
                                        "Container listing failing",
                                    )
                                    .await;
                            }
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down gather loop");
                    break;
                }
            }
        }
    }
}
