//! Agent library for mesos container metrics enrichment
//!
//! This crate provides the core functionality for:
//! - Talking to the mesos agent v1 operator API
//! - Caching and reconciling container naming metadata
//! - Gathering and emitting tagged container metrics
//! - Health checks and observability

pub mod client;
pub mod gather;
pub mod health;
pub mod metadata;
pub mod models;
pub mod observability;

pub use client::{AgentApi, AgentError, ClientConfig, MesosClient};
pub use gather::{
    CycleError, CycleSummary, FieldValue, GatherConfig, GatherLoop, Gatherer, MetricPoint,
    MetricSink,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use metadata::MetadataCache;
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
