//! Offline preview of container metadata resolution.
//!
//! Runs the same matching the agent runs in its gather loop: fetch live
//! containers, fetch agent state, reconcile one into the other, and print
//! the resulting records. Useful for checking why a container's metrics
//! carry empty names.

use anyhow::Result;
use tabled::Tabled;

use agent_lib::client::{AgentApi, MesosClient};
use agent_lib::metadata::MetadataCache;
use agent_lib::models::ContainerMetadata;

use crate::output::{or_dash, print_info, print_success, print_warning, short_id, OutputFormat};

/// Row for the resolution table
#[derive(Tabled)]
struct ResolveRow {
    #[tabled(rename = "Container")]
    container_id: String,
    #[tabled(rename = "Task")]
    task_name: String,
    #[tabled(rename = "Executor")]
    executor_name: String,
    #[tabled(rename = "Framework")]
    framework_name: String,
    #[tabled(rename = "Labels")]
    labels: String,
}

/// Match live containers against agent state and show the resulting metadata
pub async fn resolve_containers(
    client: &MesosClient,
    unmatched_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let samples = client.fetch_containers().await?;
    if samples.is_empty() {
        print_warning("No containers running on this agent");
        return Ok(());
    }

    let state = client.fetch_state().await?;

    let cache = MetadataCache::new();
    cache.reconcile(&samples, &state).await;
    let records = cache.snapshot().await;

    let unmatched = records.iter().filter(|r| r.task_name.is_empty()).count();
    let shown: Vec<ContainerMetadata> = if unmatched_only {
        records
            .into_iter()
            .filter(|r| r.task_name.is_empty())
            .collect()
    } else {
        records
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&shown)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if shown.is_empty() {
                print_success("Every live container matched a task");
                return Ok(());
            }

            let rows: Vec<ResolveRow> = shown.iter().map(resolve_row).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!();

            if unmatched > 0 {
                print_warning(&format!(
                    "{} of {} containers matched no task and would be tagged with empty names",
                    unmatched,
                    samples.len()
                ));
                print_info("A container matches when a task's first status carries its id or its parent's id");
            } else {
                print_success(&format!("All {} containers matched a task", samples.len()));
            }
        }
    }

    Ok(())
}

fn resolve_row(record: &ContainerMetadata) -> ResolveRow {
    let mut labels: Vec<_> = record.task_labels.iter().collect();
    labels.sort();
    let labels = labels
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    ResolveRow {
        container_id: short_id(&record.container_id),
        task_name: or_dash(&record.task_name),
        executor_name: or_dash(&record.executor_name),
        framework_name: or_dash(&record.framework_name),
        labels: or_dash(&labels),
    }
}
