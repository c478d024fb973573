//! Client mode — submit one task to a node.

use std::io::Write;

use anyhow::Context;
use tracing::info;

use warpmesh_core::{SubmitReply, Task, parse_duration};
use warpmesh_peer::HttpTransport;

/// Submit, wait for the result and write the output bytes to stdout.
pub async fn run(node: &str, id: String, input: Vec<u8>, timeout: &str) -> anyhow::Result<()> {
    let timeout = parse_duration(timeout).with_context(|| format!("invalid --timeout {timeout:?}"))?;
    let task = Task::new(id, input);

    let reply = tokio::time::timeout(timeout, HttpTransport::new().submit_task(node, &task))
        .await
        .with_context(|| format!("no reply from {node} within {timeout:?}"))??;

    match reply {
        SubmitReply::Completed {
            task_id,
            executed_by,
            output,
            attempts,
        } => {
            info!(%task_id, %executed_by, attempts, "task completed");
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
            Ok(())
        }
        SubmitReply::Failed {
            code,
            error,
            exit_code,
            executed_by,
        } => {
            let status = exit_code.map(|c| format!(", exit code {c}")).unwrap_or_default();
            match executed_by {
                Some(on) => anyhow::bail!("{}: {error} (on {on}{status})", code.as_str()),
                None => anyhow::bail!("{}: {error}{status}", code.as_str()),
            }
        }
    }
}
