//! Matching live containers to the tasks and frameworks that own them.
//!
//! Matching policy, in order:
//!
//! - tasks are scanned in snapshot order and the first match wins
//! - only the first status of each task is consulted; tasks without
//!   statuses never match
//! - a status matches a container when it references it directly or, for
//!   nested containers, as the parent of the status's own container id
//!
//! A container that matches nothing still gets a record with empty names,
//! so lookups and consistency checks treat it like any other entry.

use std::collections::HashMap;

use tracing::warn;

use crate::models::{
    ContainerMetadata, ContainerSample, FrameworkInfo, StateSnapshot, TaskInfo,
};

/// Create records for live containers missing from `entries`. Existing
/// records are left as they are. Returns the number created.
pub(super) fn reconcile_into(
    entries: &mut HashMap<String, ContainerMetadata>,
    live: &[ContainerSample],
    state: &StateSnapshot,
) -> usize {
    let mut created = 0;
    for sample in live {
        if entries.contains_key(&sample.container_id) {
            continue;
        }
        let record = resolve(sample, state);
        if record.task_name.is_empty() {
            warn!(
                container_id = %sample.container_id,
                "No task matched container; caching record with empty task name"
            );
        }
        entries.insert(sample.container_id.clone(), record);
        created += 1;
    }
    created
}

/// Build the metadata record for one container from a state snapshot.
fn resolve(sample: &ContainerSample, state: &StateSnapshot) -> ContainerMetadata {
    let task = find_task(&sample.container_id, &state.tasks);
    let framework = find_framework(&sample.framework_id, &state.frameworks);

    ContainerMetadata {
        container_id: sample.container_id.clone(),
        task_name: task.map(|t| t.name.clone()).unwrap_or_default(),
        executor_name: sample.executor_name.clone().unwrap_or_default(),
        framework_name: framework.map(|f| f.name.clone()).unwrap_or_default(),
        task_labels: task.map(|t| t.labels.clone()).unwrap_or_default(),
    }
}

fn find_task<'a>(container_id: &str, tasks: &'a [TaskInfo]) -> Option<&'a TaskInfo> {
    tasks.iter().find(|task| {
        task.statuses.first().map_or(false, |status| {
            status.container_id.as_deref() == Some(container_id)
                || status.parent_container_id.as_deref() == Some(container_id)
        })
    })
}

fn find_framework<'a>(framework_id: &str, frameworks: &'a [FrameworkInfo]) -> Option<&'a FrameworkInfo> {
    if framework_id.is_empty() {
        return None;
    }
    frameworks.iter().find(|f| f.id == framework_id)
}
