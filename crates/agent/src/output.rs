//! Metric point output
//!
//! Drains the gather loop's channel and writes one JSON document per line
//! to the given writer (stdout in production), so downstream collectors
//! can consume the stream without framing logic.

use agent_lib::{health::components, HealthRegistry, MetricPoint};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Write points until the channel closes or the writer fails.
pub async fn write_points<W>(
    mut points_rx: mpsc::Receiver<MetricPoint>,
    mut out: W,
    health: HealthRegistry,
) where
    W: AsyncWrite + Unpin,
{
    let mut written: u64 = 0;

    while let Some(point) = points_rx.recv().await {
        let mut line = match serde_json::to_vec(&point) {
            Ok(line) => line,
            Err(error) => {
                error!(error = %error, "Failed to encode metric point");
                continue;
            }
        };
        line.push(b'\n');

        if let Err(error) = write_line(&mut out, &line).await {
            error!(error = %error, "Failed to write metric point; stopping output");
            health
                .set_unhealthy(components::OUTPUT, error.to_string())
                .await;
            return;
        }

        written += 1;
        if written % 100 == 0 {
            debug!(written, "Metric points written");
        }
    }

    debug!(written, "Metric channel closed; output writer exiting");
}

async fn write_line<W>(out: &mut W, line: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(line).await?;
    out.flush().await
}
