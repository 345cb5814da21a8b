//! Agent framework and task state

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use agent_lib::client::{AgentApi, MesosClient};
use agent_lib::models::TaskInfo;

use crate::output::{or_dash, print_warning, short_id, OutputFormat};

/// Row for the frameworks table
#[derive(Tabled)]
struct FrameworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// Row for the tasks table
#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Task")]
    name: String,
    #[tabled(rename = "Container")]
    container_id: String,
    #[tabled(rename = "Parent")]
    parent_container_id: String,
    #[tabled(rename = "Labels")]
    labels: String,
}

/// Show the agent's frameworks and tasks
pub async fn show_state(client: &MesosClient, tasks_only: bool, format: OutputFormat) -> Result<()> {
    let snapshot = client.fetch_state().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if !tasks_only {
                println!("{}", "Frameworks".bold());
                if snapshot.frameworks.is_empty() {
                    print_warning("No frameworks registered on this agent");
                } else {
                    let rows: Vec<FrameworkRow> = snapshot
                        .frameworks
                        .iter()
                        .map(|f| FrameworkRow {
                            id: short_id(&f.id),
                            name: f.name.clone(),
                        })
                        .collect();
                    let table = tabled::Table::new(rows)
                        .with(tabled::settings::Style::rounded())
                        .to_string();
                    println!("{}", table);
                }
                println!();
            }

            println!("{}", "Tasks".bold());
            if snapshot.tasks.is_empty() {
                print_warning("No tasks known to this agent");
                return Ok(());
            }

            let rows: Vec<TaskRow> = snapshot.tasks.iter().map(task_row).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} tasks", snapshot.tasks.len());
        }
    }

    Ok(())
}

fn task_row(task: &TaskInfo) -> TaskRow {
    // Only the first status carries the container reference the agent
    // matches on, so that is the one worth showing.
    let status = task.statuses.first();
    TaskRow {
        name: task.name.clone(),
        container_id: status
            .and_then(|s| s.container_id.as_deref())
            .map(short_id)
            .unwrap_or_else(|| "-".to_string()),
        parent_container_id: status
            .and_then(|s| s.parent_container_id.as_deref())
            .map(short_id)
            .unwrap_or_else(|| "-".to_string()),
        labels: or_dash(&format_labels(task)),
    }
}

fn format_labels(task: &TaskInfo) -> String {
    let mut pairs: Vec<_> = task.labels.iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
