use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Instant, timeout};

use crate::compiler::Artifact;

/// Raw outcome of one bounded run of a compiled artifact. A timeout or a
/// nonzero exit is data here, not an error; only a failure to launch the
/// process at all is reported through [`RunError`].
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("failed to launch program: {msg}")]
    FailedToLaunch { msg: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    async fn run_once(
        &self,
        artifact: &Artifact,
        input: &str,
        timeout: Duration,
    ) -> Result<ExecutionOutcome, RunError>;
}

/// Runs artifacts as plain child processes with piped stdio and a hard
/// timeout. Holds no state: independent invocations may run concurrently for
/// independent submissions.
#[derive(Debug, Default)]
pub struct NativeRunner;

impl NativeRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Runner for NativeRunner {
    async fn run_once(
        &self,
        artifact: &Artifact,
        input: &str,
        limit: Duration,
    ) -> Result<ExecutionOutcome, RunError> {
        let mut cmd = Command::new(&artifact.path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| RunError::FailedToLaunch {
            msg: format!("failed to spawn {}: {e}", artifact.path.display()),
        })?;

        // Feeding stdin happens inside the timed section: a program that
        // never reads its input must still hit the timeout, not stall us on a
        // full pipe.
        let run = async {
            if let Some(mut stdin) = child.stdin.take() {
                if !input.is_empty() {
                    let mut data = input.as_bytes().to_vec();
                    // Line-oriented C programs expect a terminating newline.
                    if !input.ends_with('\n') {
                        data.push(b'\n');
                    }
                    if let Err(e) = stdin.write_all(&data).await {
                        // The program may exit without consuming stdin; a
                        // broken pipe is its business, not a launch failure.
                        tracing::debug!(error = %e, "short write to program stdin");
                    }
                }
                // Dropping the handle closes the pipe and signals end-of-input.
            }
            child.wait_with_output().await
        };

        match timeout(limit, run).await {
            Ok(waited) => {
                let output = waited.map_err(|e| RunError::FailedToLaunch {
                    msg: format!("failed to wait for program: {e}"),
                })?;
                Ok(ExecutionOutcome {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code().unwrap_or(-1),
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: false,
                })
            }
            Err(_) => {
                // Dropping the future drops the child; kill_on_drop delivers
                // SIGKILL immediately, with no graceful-termination grace
                // period. A hung program gets no second chance.
                tracing::debug!(
                    artifact = %artifact.path.display(),
                    timeout_ms = limit.as_millis() as u64,
                    "program timed out, killed"
                );
                Ok(ExecutionOutcome {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: -1,
                    duration_ms: started.elapsed().as_millis() as u64,
                    timed_out: true,
                })
            }
        }
    }
}
