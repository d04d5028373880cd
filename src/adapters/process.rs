use crate::error::ToolError;
use crate::ports::tools::{ToolCommand, ToolOutcome, ToolRunner};
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Runs external tools, at most `workers` at a time across all requests.
#[derive(Clone)]
pub struct ProcessRunner {
    permits: Arc<Semaphore>,
}

impl ProcessRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, command: ToolCommand) -> Result<ToolOutcome, ToolError> {
        let _permit = self.permits.acquire().await.map_err(|e| ToolError::Io {
            program: command.program.clone(),
            source: io::Error::other(e),
        })?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        debug!(program = %command.program, args = ?command.args, "Spawning tool");
        let child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ToolError::NotFound(command.program.clone()),
            _ => ToolError::Io {
                program: command.program.clone(),
                source: e,
            },
        })?;

        // Dropping the wait future on timeout kills the child.
        match tokio::time::timeout(command.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolOutcome {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
                timed_out: false,
            }),
            Ok(Err(e)) => Err(ToolError::Io {
                program: command.program,
                source: e,
            }),
            Err(_) => {
                warn!(
                    program = %command.program,
                    timeout_secs = command.timeout.as_secs(),
                    "Tool timed out, killed"
                );
                Ok(ToolOutcome {
                    timed_out: true,
                    ..Default::default()
                })
            }
        }
    }
}
