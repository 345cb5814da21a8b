//! Metric point assembly and emission.
//!
//! Field and tag shaping rules live here: statistics counters flatten into
//! fields only when present, naming tags are omitted while their metadata
//! is unresolved, and timestamps truncate to whole seconds.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::models::{ContainerMetadata, ContainerSample, ResourceStatistics};

/// Measurement name for per-container resource metrics
pub const CONTAINERS_MEASUREMENT: &str = "mesos_containers";

/// A single numeric field value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Unsigned(u64),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Unsigned(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Unsigned(value as u64)
    }
}

/// One tagged, timestamped measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    /// Unix timestamp in whole seconds
    pub timestamp: i64,
}

/// Destination for assembled metric points.
///
/// `add` must not block: sinks buffer or drop, they never stall a cycle.
pub trait MetricSink: Send + Sync {
    fn add(&self, point: MetricPoint);
}

/// Sink that forwards points into an mpsc channel, dropping on overflow
pub struct ChannelSink {
    tx: mpsc::Sender<MetricPoint>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<MetricPoint>) -> Self {
        Self { tx }
    }
}

impl MetricSink for ChannelSink {
    fn add(&self, point: MetricPoint) {
        match self.tx.try_send(point) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Metric buffer full; dropping point");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Metric channel closed; dropping point");
            }
        }
    }
}

/// Assemble the metric point for one live container, or `None` when the
/// sample carries nothing to report.
pub fn container_point(
    sample: &ContainerSample,
    metadata: &ContainerMetadata,
) -> Option<MetricPoint> {
    let stats = sample.resource_statistics.as_ref()?;
    let fields = statistics_fields(stats);
    if fields.is_empty() {
        return None;
    }
    Some(MetricPoint {
        measurement: CONTAINERS_MEASUREMENT.to_string(),
        tags: container_tags(metadata),
        fields,
        timestamp: point_timestamp(stats),
    })
}

/// Flatten resource statistics into named fields, skipping absent counters.
pub fn statistics_fields(stats: &ResourceStatistics) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();

    fn put<T: Into<FieldValue>>(
        fields: &mut BTreeMap<String, FieldValue>,
        name: &str,
        value: Option<T>,
    ) {
        if let Some(v) = value {
            fields.insert(name.to_string(), v.into());
        }
    }

    put(&mut fields, "cpus_limit", stats.cpus_limit);
    put(&mut fields, "cpus_nr_periods", stats.cpus_nr_periods);
    put(&mut fields, "cpus_nr_throttled", stats.cpus_nr_throttled);
    put(&mut fields, "cpus_system_time_secs", stats.cpus_system_time_secs);
    put(&mut fields, "cpus_throttled_time_secs", stats.cpus_throttled_time_secs);
    put(&mut fields, "cpus_user_time_secs", stats.cpus_user_time_secs);
    put(&mut fields, "mem_anon_bytes", stats.mem_anon_bytes);
    put(&mut fields, "mem_file_bytes", stats.mem_file_bytes);
    put(&mut fields, "mem_limit_bytes", stats.mem_limit_bytes);
    put(&mut fields, "mem_mapped_file_bytes", stats.mem_mapped_file_bytes);
    put(&mut fields, "mem_rss_bytes", stats.mem_rss_bytes);
    put(&mut fields, "disk_limit_bytes", stats.disk_limit_bytes);
    put(&mut fields, "disk_used_bytes", stats.disk_used_bytes);
    put(&mut fields, "net_rx_bytes", stats.net_rx_bytes);
    put(&mut fields, "net_rx_dropped", stats.net_rx_dropped);
    put(&mut fields, "net_rx_errors", stats.net_rx_errors);
    put(&mut fields, "net_rx_packets", stats.net_rx_packets);
    put(&mut fields, "net_tx_bytes", stats.net_tx_bytes);
    put(&mut fields, "net_tx_dropped", stats.net_tx_dropped);
    put(&mut fields, "net_tx_errors", stats.net_tx_errors);
    put(&mut fields, "net_tx_packets", stats.net_tx_packets);
    put(&mut fields, "processes", stats.processes);
    put(&mut fields, "threads", stats.threads);

    fields
}

/// Build the tag set for one container's metadata record.
///
/// Task labels come first; the reserved `container_id`, `service_name`,
/// `executor_name` and `task_name` tags overwrite any label with the same
/// key. Naming tags whose metadata is the empty string are omitted
/// entirely, never emitted empty.
pub fn container_tags(metadata: &ContainerMetadata) -> BTreeMap<String, String> {
    let mut tags: BTreeMap<String, String> = metadata
        .task_labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    tags.insert("container_id".to_string(), metadata.container_id.clone());
    if !metadata.framework_name.is_empty() {
        tags.insert("service_name".to_string(), metadata.framework_name.clone());
    }
    if !metadata.executor_name.is_empty() {
        tags.insert("executor_name".to_string(), metadata.executor_name.clone());
    }
    if !metadata.task_name.is_empty() {
        tags.insert("task_name".to_string(), metadata.task_name.clone());
    }
    tags
}

/// Timestamp for a point: the statistics timestamp truncated to seconds.
pub fn point_timestamp(stats: &ResourceStatistics) -> i64 {
    stats.timestamp.trunc() as i64
}
