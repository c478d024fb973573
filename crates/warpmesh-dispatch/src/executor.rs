//! Local task execution.
//!
//! What a task computes is not the scheduler's business; it only needs
//! something that turns a [`Task`] into output bytes or a failure.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use warpmesh_core::{ExecutionFailure, MeshConfig, Task, TaskOutput};

/// Runs a task on this node.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> Result<TaskOutput, ExecutionFailure>;
}

/// Runs a configured program once per task.
///
/// The task input is written to stdin and stdout becomes the output. A
/// non-zero exit is a failure carrying stderr (or the exit code when
/// stderr is empty). The task id is exported as `WARPMESH_TASK_ID`.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    args: Vec<String>,
}

impl ProcessExecutor {
    /// Returns `None` for an empty command line.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn from_config(config: &MeshConfig) -> Option<Self> {
        Self::new(&config.executor.command)
    }
}

#[async_trait]
impl TaskExecutor for ProcessExecutor {
    async fn execute(&self, task: &Task) -> Result<TaskOutput, ExecutionFailure> {
        debug!(task_id = %task.id, program = %self.program, "executing task locally");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("WARPMESH_TASK_ID", &task.id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionFailure::new(format!("failed to start {}: {e}", self.program)))?;

        let stdin = child.stdin.take();
        let input = task.input.clone();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output =
            output.map_err(|e| ExecutionFailure::new(format!("failed to wait for {}: {e}", self.program)))?;
        if let Err(e) = fed {
            // Programs that ignore their input close stdin early.
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(ExecutionFailure::new(format!("failed to write task input: {e}")));
            }
        }

        if output.status.success() {
            info!(task_id = %task.id, bytes = output.stdout.len(), "task completed locally");
            return Ok(TaskOutput {
                task_id: task.id.clone(),
                output: output.stdout,
            });
        }

        let exit_code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            match exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            stderr
        };
        info!(task_id = %task.id, ?exit_code, "task failed locally");

        let failure = ExecutionFailure::new(message);
        Err(match exit_code {
            Some(code) => failure.with_exit_code(code),
            None => failure,
        })
    }
}
