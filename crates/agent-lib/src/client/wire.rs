//! Serde model of the mesos agent v1 operator API responses.
//!
//! Only the slices of `GET_CONTAINERS` and `GET_STATE` the agent consumes
//! are modelled. Fields the agent may legitimately receive without are
//! optional or defaulted so a sparse response decodes cleanly.

use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{
    ContainerSample, FrameworkInfo, ResourceStatistics, StateSnapshot, TaskInfo, TaskStatusRef,
};

/// Top-level envelope of every v1 operator API response
#[derive(Debug, Deserialize)]
pub(crate) struct AgentResponse {
    #[serde(rename = "type")]
    pub response_type: Option<String>,
    pub get_containers: Option<GetContainers>,
    pub get_state: Option<GetState>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetContainers {
    #[serde(default)]
    pub containers: Vec<WireContainer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContainer {
    pub container_id: WireContainerId,
    pub framework_id: Option<WireId>,
    pub executor_name: Option<String>,
    pub resource_statistics: Option<ResourceStatistics>,
}

impl WireContainer {
    pub fn into_sample(self) -> ContainerSample {
        ContainerSample {
            container_id: self.container_id.value,
            framework_id: self.framework_id.map(|id| id.value).unwrap_or_default(),
            executor_name: self.executor_name,
            resource_statistics: self.resource_statistics,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireId {
    pub value: String,
}

/// A container id, possibly nested under a parent
#[derive(Debug, Deserialize)]
pub(crate) struct WireContainerId {
    pub value: String,
    pub parent: Option<Box<WireContainerId>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetState {
    pub get_tasks: Option<GetTasks>,
    pub get_frameworks: Option<GetFrameworks>,
}

impl GetState {
    pub fn into_snapshot(self) -> StateSnapshot {
        StateSnapshot {
            tasks: self
                .get_tasks
                .map(|t| t.tasks.into_iter().map(WireTask::into_task).collect())
                .unwrap_or_default(),
            frameworks: self
                .get_frameworks
                .map(|f| {
                    f.frameworks
                        .into_iter()
                        .map(WireFramework::into_framework)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetTasks {
    #[serde(default)]
    pub tasks: Vec<WireTask>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTask {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<WireTaskStatus>,
    pub labels: Option<WireLabels>,
}

impl WireTask {
    fn into_task(self) -> TaskInfo {
        TaskInfo {
            name: self.name,
            statuses: self
                .statuses
                .into_iter()
                .map(WireTaskStatus::into_status_ref)
                .collect(),
            labels: self.labels.map(WireLabels::into_map).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTaskStatus {
    pub container_status: Option<WireContainerStatus>,
}

impl WireTaskStatus {
    fn into_status_ref(self) -> TaskStatusRef {
        let container_id = self.container_status.and_then(|cs| cs.container_id);
        match container_id {
            Some(id) => TaskStatusRef {
                container_id: Some(id.value),
                parent_container_id: id.parent.map(|p| p.value),
            },
            None => TaskStatusRef::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContainerStatus {
    pub container_id: Option<WireContainerId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabels {
    #[serde(default)]
    pub labels: Vec<WireLabel>,
}

impl WireLabels {
    fn into_map(self) -> HashMap<String, String> {
        self.labels
            .into_iter()
            .map(|l| (l.key, l.value.unwrap_or_default()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetFrameworks {
    #[serde(default)]
    pub frameworks: Vec<WireFramework>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFramework {
    pub framework_info: WireFrameworkInfo,
}

impl WireFramework {
    fn into_framework(self) -> FrameworkInfo {
        FrameworkInfo {
            id: self
                .framework_info
                .id
                .map(|id| id.value)
                .unwrap_or_default(),
            name: self.framework_info.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFrameworkInfo {
    pub id: Option<WireId>,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_response_decodes_and_converts() {
        let body = r#"{
            "type": "GET_CONTAINERS",
            "get_containers": {
                "containers": [
                    {
                        "container_id": {"value": "abc123"},
                        "framework_id": {"value": "fw-1"},
                        "executor_name": "Thermos executor",
                        "resource_statistics": {
                            "timestamp": 1388534400.48,
                            "cpus_limit": 8.25,
                            "mem_rss_bytes": 567
                        }
                    },
                    {
                        "container_id": {"value": "nested", "parent": {"value": "outer"}}
                    }
                ]
            }
        }"#;

        let resp: AgentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.response_type.as_deref(), Some("GET_CONTAINERS"));

        let containers = resp.get_containers.unwrap().containers;
        let samples: Vec<_> = containers.into_iter().map(WireContainer::into_sample).collect();

        assert_eq!(samples[0].container_id, "abc123");
        assert_eq!(samples[0].framework_id, "fw-1");
        assert_eq!(samples[0].executor_name.as_deref(), Some("Thermos executor"));
        let stats = samples[0].resource_statistics.as_ref().unwrap();
        assert_eq!(stats.cpus_limit, Some(8.25));
        assert_eq!(stats.mem_rss_bytes, Some(567));
        assert!(stats.mem_limit_bytes.is_none());

        // A standalone nested container keeps its own id and tolerates
        // missing framework, executor and statistics.
        assert_eq!(samples[1].container_id, "nested");
        assert_eq!(samples[1].framework_id, "");
        assert!(samples[1].executor_name.is_none());
        assert!(samples[1].resource_statistics.is_none());
    }

    #[test]
    fn state_response_converts_to_snapshot() {
        let body = r#"{
            "type": "GET_STATE",
            "get_state": {
                "get_tasks": {
                    "tasks": [
                        {
                            "name": "hello-world",
                            "statuses": [
                                {"container_status": {"container_id": {"value": "inner", "parent": {"value": "outer"}}}},
                                {"container_status": {"container_id": {"value": "later"}}}
                            ],
                            "labels": {"labels": [{"key": "team", "value": "core"}, {"key": "bare"}]}
                        },
                        {"name": "no-statuses"}
                    ]
                },
                "get_frameworks": {
                    "frameworks": [
                        {"framework_info": {"id": {"value": "fw-1"}, "name": "marathon"}}
                    ]
                }
            }
        }"#;

        let resp: AgentResponse = serde_json::from_str(body).unwrap();
        let snapshot = resp.get_state.unwrap().into_snapshot();

        assert_eq!(snapshot.tasks.len(), 2);
        let task = &snapshot.tasks[0];
        assert_eq!(task.name, "hello-world");
        assert_eq!(task.statuses[0].container_id.as_deref(), Some("inner"));
        assert_eq!(task.statuses[0].parent_container_id.as_deref(), Some("outer"));
        assert_eq!(task.statuses[1].parent_container_id, None);
        assert_eq!(task.labels.get("team").map(String::as_str), Some("core"));
        assert_eq!(task.labels.get("bare").map(String::as_str), Some(""));
        assert!(snapshot.tasks[1].statuses.is_empty());

        assert_eq!(snapshot.frameworks.len(), 1);
        assert_eq!(snapshot.frameworks[0].id, "fw-1");
        assert_eq!(snapshot.frameworks[0].name, "marathon");
    }

    #[test]
    fn state_without_subsections_yields_empty_snapshot() {
        let body = r#"{"type": "GET_STATE", "get_state": {}}"#;
        let resp: AgentResponse = serde_json::from_str(body).unwrap();
        let snapshot = resp.get_state.unwrap().into_snapshot();
        assert!(snapshot.tasks.is_empty());
        assert!(snapshot.frameworks.is_empty());
    }
}
