//! Core data models for the metrics agent

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One live container as reported by the mesos agent's `GET_CONTAINERS` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSample {
    pub container_id: String,
    pub framework_id: String,
    pub executor_name: Option<String>,
    pub resource_statistics: Option<ResourceStatistics>,
}

/// Point-in-time resource counters for one container.
///
/// Mirrors the mesos `ResourceStatistics` message: `timestamp` is always
/// present, every counter is optional and absent counters stay absent in
/// the emitted metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatistics {
    pub timestamp: f64,
    pub cpus_limit: Option<f64>,
    pub cpus_nr_periods: Option<u32>,
    pub cpus_nr_throttled: Option<u32>,
    pub cpus_system_time_secs: Option<f64>,
    pub cpus_throttled_time_secs: Option<f64>,
    pub cpus_user_time_secs: Option<f64>,
    pub mem_anon_bytes: Option<u64>,
    pub mem_file_bytes: Option<u64>,
    pub mem_limit_bytes: Option<u64>,
    pub mem_mapped_file_bytes: Option<u64>,
    pub mem_rss_bytes: Option<u64>,
    pub disk_limit_bytes: Option<u64>,
    pub disk_used_bytes: Option<u64>,
    pub net_rx_bytes: Option<u64>,
    pub net_rx_dropped: Option<u64>,
    pub net_rx_errors: Option<u64>,
    pub net_rx_packets: Option<u64>,
    pub net_tx_bytes: Option<u64>,
    pub net_tx_dropped: Option<u64>,
    pub net_tx_errors: Option<u64>,
    pub net_tx_packets: Option<u64>,
    pub processes: Option<u32>,
    pub threads: Option<u32>,
}

/// Cached naming metadata for one container.
///
/// Records are whole-record: built in one shot during reconciliation and
/// never field-patched afterwards. Fields that could not be resolved hold
/// the empty string (or an empty label map) rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    pub container_id: String,
    pub task_name: String,
    pub executor_name: String,
    pub framework_name: String,
    pub task_labels: HashMap<String, String>,
}

/// Task and framework state from the mesos agent's `GET_STATE` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tasks: Vec<TaskInfo>,
    pub frameworks: Vec<FrameworkInfo>,
}

/// A task known to the agent, in snapshot order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
    /// Status updates in declaration order; only the first one carries the
    /// container reference used for matching.
    pub statuses: Vec<TaskStatusRef>,
    pub labels: HashMap<String, String>,
}

/// Container reference carried by a single task status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusRef {
    pub container_id: Option<String>,
    /// Set when the status points at a nested container; holds the id of
    /// the enclosing parent container.
    pub parent_container_id: Option<String>,
}

/// A framework registered on the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub id: String,
    pub name: String,
}
