//! Live container listing

use anyhow::Result;
use tabled::Tabled;

use agent_lib::client::{AgentApi, MesosClient};
use agent_lib::models::ContainerSample;

use crate::output::{format_opt_bytes, format_timestamp, print_warning, short_id, OutputFormat};

/// Row for the containers table
#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "Container")]
    container_id: String,
    #[tabled(rename = "Framework")]
    framework_id: String,
    #[tabled(rename = "Executor")]
    executor: String,
    #[tabled(rename = "CPUs")]
    cpus_limit: String,
    #[tabled(rename = "Mem RSS")]
    mem_rss: String,
    #[tabled(rename = "Mem Limit")]
    mem_limit: String,
    #[tabled(rename = "Disk Used")]
    disk_used: String,
    #[tabled(rename = "Sampled")]
    sampled: String,
}

/// List live containers with their latest resource statistics
pub async fn list_containers(client: &MesosClient, format: OutputFormat) -> Result<()> {
    let samples = client.fetch_containers().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&samples)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if samples.is_empty() {
                print_warning("No containers running on this agent");
                return Ok(());
            }

            let rows: Vec<ContainerRow> = samples.iter().map(container_row).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} containers", samples.len());
        }
    }

    Ok(())
}

fn container_row(sample: &ContainerSample) -> ContainerRow {
    let stats = sample.resource_statistics.as_ref();
    ContainerRow {
        container_id: short_id(&sample.container_id),
        framework_id: short_id(&sample.framework_id),
        executor: sample
            .executor_name
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        cpus_limit: stats
            .and_then(|s| s.cpus_limit)
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string()),
        mem_rss: format_opt_bytes(stats.and_then(|s| s.mem_rss_bytes)),
        mem_limit: format_opt_bytes(stats.and_then(|s| s.mem_limit_bytes)),
        disk_used: format_opt_bytes(stats.and_then(|s| s.disk_used_bytes)),
        sampled: stats
            .map(|s| format_timestamp(s.timestamp))
            .unwrap_or_else(|| "-".to_string()),
    }
}
