//! Behavioral tests for the metadata cache and reconciler.

use std::collections::{HashMap, HashSet};

use super::MetadataCache;
use crate::models::{
    ContainerMetadata, ContainerSample, FrameworkInfo, StateSnapshot, TaskInfo, TaskStatusRef,
};

fn sample(id: &str, framework_id: &str, executor: Option<&str>) -> ContainerSample {
    ContainerSample {
        container_id: id.to_string(),
        framework_id: framework_id.to_string(),
        executor_name: executor.map(str::to_string),
        resource_statistics: None,
    }
}

fn direct_status(container_id: &str) -> TaskStatusRef {
    TaskStatusRef {
        container_id: Some(container_id.to_string()),
        parent_container_id: None,
    }
}

fn nested_status(container_id: &str, parent: &str) -> TaskStatusRef {
    TaskStatusRef {
        container_id: Some(container_id.to_string()),
        parent_container_id: Some(parent.to_string()),
    }
}

fn task(name: &str, statuses: Vec<TaskStatusRef>) -> TaskInfo {
    TaskInfo {
        name: name.to_string(),
        statuses,
        labels: HashMap::new(),
    }
}

fn framework(id: &str, name: &str) -> FrameworkInfo {
    FrameworkInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn state(tasks: Vec<TaskInfo>, frameworks: Vec<FrameworkInfo>) -> StateSnapshot {
    StateSnapshot { tasks, frameworks }
}

fn live_ids(samples: &[ContainerSample]) -> HashSet<String> {
    samples.iter().map(|s| s.container_id.clone()).collect()
}

#[tokio::test]
async fn reconcile_covers_every_live_container() {
    let cache = MetadataCache::new();
    let live = vec![
        sample("abc", "fw-1", Some("executor one")),
        sample("unknowable", "fw-9", None),
    ];
    let snapshot = state(
        vec![task("hello", vec![direct_status("abc")])],
        vec![framework("fw-1", "marathon")],
    );

    let created = cache.reconcile(&live, &snapshot).await;
    assert_eq!(created, 2);
    assert!(cache.is_consistent(&live_ids(&live)).await);

    let matched = cache.get("abc").await.unwrap();
    assert_eq!(matched.task_name, "hello");
    assert_eq!(matched.framework_name, "marathon");
    assert_eq!(matched.executor_name, "executor one");

    // Containers nothing matches still get a record, with empty names.
    let unmatched = cache.get("unknowable").await.unwrap();
    assert_eq!(unmatched.task_name, "");
    assert_eq!(unmatched.framework_name, "");
    assert_eq!(unmatched.executor_name, "");
    assert!(unmatched.task_labels.is_empty());
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let cache = MetadataCache::new();
    let live = vec![sample("abc", "fw-1", Some("executor one"))];
    let snapshot = state(
        vec![task("hello", vec![direct_status("abc")])],
        vec![framework("fw-1", "marathon")],
    );

    assert_eq!(cache.reconcile(&live, &snapshot).await, 1);
    let first = cache.snapshot().await;

    assert_eq!(cache.reconcile(&live, &snapshot).await, 0);
    assert_eq!(cache.snapshot().await, first);
}

#[tokio::test]
async fn existing_records_are_never_rewritten() {
    let cache = MetadataCache::new();
    cache
        .insert(ContainerMetadata {
            container_id: "abc".to_string(),
            task_name: "original".to_string(),
            executor_name: "original executor".to_string(),
            framework_name: "original framework".to_string(),
            task_labels: HashMap::new(),
        })
        .await;

    // A later snapshot names the task differently; the cached record wins
    // until the container goes away and is pruned.
    let live = vec![sample("abc", "fw-1", Some("renamed executor"))];
    let snapshot = state(
        vec![task("renamed", vec![direct_status("abc")])],
        vec![framework("fw-1", "renamed framework")],
    );

    assert_eq!(cache.reconcile(&live, &snapshot).await, 0);
    let record = cache.get("abc").await.unwrap();
    assert_eq!(record.task_name, "original");
    assert_eq!(record.executor_name, "original executor");
    assert_eq!(record.framework_name, "original framework");
}

#[tokio::test]
async fn nested_container_matches_through_parent_id() {
    let cache = MetadataCache::new();
    // The live container is the parent; the task status references the
    // nested child and names the parent through parent_container_id.
    let live = vec![sample("outer", "fw-1", Some("nested executor"))];
    let snapshot = state(
        vec![task("nested-task", vec![nested_status("inner", "outer")])],
        vec![framework("fw-1", "marathon")],
    );

    cache.reconcile(&live, &snapshot).await;
    let record = cache.get("outer").await.unwrap();
    assert_eq!(record.task_name, "nested-task");
    assert_eq!(record.framework_name, "marathon");
}

#[tokio::test]
async fn only_the_first_status_is_consulted() {
    let cache = MetadataCache::new();
    let live = vec![sample("abc", "fw-1", None)];
    // The matching reference sits in the second status, so the task must
    // not match.
    let snapshot = state(
        vec![task(
            "late-match",
            vec![direct_status("elsewhere"), direct_status("abc")],
        )],
        vec![],
    );

    cache.reconcile(&live, &snapshot).await;
    assert_eq!(cache.get("abc").await.unwrap().task_name, "");
}

#[tokio::test]
async fn tasks_without_statuses_never_match() {
    let cache = MetadataCache::new();
    let live = vec![sample("abc", "fw-1", None)];
    let snapshot = state(vec![task("statusless", vec![])], vec![]);

    cache.reconcile(&live, &snapshot).await;
    assert_eq!(cache.get("abc").await.unwrap().task_name, "");
}

#[tokio::test]
async fn first_matching_task_wins() {
    let cache = MetadataCache::new();
    let live = vec![sample("abc", "fw-1", None)];
    let snapshot = state(
        vec![
            task("first", vec![direct_status("abc")]),
            task("second", vec![direct_status("abc")]),
        ],
        vec![],
    );

    cache.reconcile(&live, &snapshot).await;
    assert_eq!(cache.get("abc").await.unwrap().task_name, "first");
}

#[tokio::test]
async fn task_labels_are_copied_into_the_record() {
    let cache = MetadataCache::new();
    let live = vec![sample("abc", "fw-1", None)];
    let mut labelled = task("hello", vec![direct_status("abc")]);
    labelled.labels.insert("team".to_string(), "core".to_string());
    labelled.labels.insert("tier".to_string(), "web".to_string());
    let snapshot = state(vec![labelled], vec![framework("fw-1", "marathon")]);

    cache.reconcile(&live, &snapshot).await;
    let record = cache.get("abc").await.unwrap();
    assert_eq!(record.task_labels.len(), 2);
    assert_eq!(record.task_labels.get("team").map(String::as_str), Some("core"));
}

#[tokio::test]
async fn unknown_framework_id_leaves_name_empty() {
    let cache = MetadataCache::new();
    let live = vec![sample("abc", "fw-other", None)];
    let snapshot = state(
        vec![task("hello", vec![direct_status("abc")])],
        vec![framework("fw-1", "marathon")],
    );

    cache.reconcile(&live, &snapshot).await;
    let record = cache.get("abc").await.unwrap();
    assert_eq!(record.task_name, "hello");
    assert_eq!(record.framework_name, "");
}

#[tokio::test]
async fn prune_then_reconcile_replaces_dead_entries() {
    let cache = MetadataCache::new();
    let old_live = vec![sample("old", "fw-1", None)];
    let old_state = state(
        vec![task("old-task", vec![direct_status("old")])],
        vec![framework("fw-1", "marathon")],
    );
    cache.reconcile(&old_live, &old_state).await;

    // The old container is gone and a new one took its place.
    let new_live = vec![sample("new", "fw-1", None)];
    let ids = live_ids(&new_live);
    assert_eq!(cache.prune(&ids).await, 1);
    assert!(!cache.is_consistent(&ids).await);

    let new_state = state(
        vec![task("new-task", vec![direct_status("new")])],
        vec![framework("fw-1", "marathon")],
    );
    cache.reconcile(&new_live, &new_state).await;

    assert!(cache.is_consistent(&ids).await);
    assert!(cache.get("old").await.is_none());
    assert_eq!(cache.get("new").await.unwrap().task_name, "new-task");
}
