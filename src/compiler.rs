use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;

use crate::domain::{Language, SourceUnit};
use crate::workspace::Workspace;

/// Handle to a compiled executable inside a workspace.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub path: PathBuf,
}

/// `Failed` is the student's fault and becomes part of the verdict.
/// `Environment` means the toolchain or the filesystem is broken and the
/// whole evaluation must abort.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("{diagnostic}")]
    Failed { diagnostic: String },

    #[error("compiler environment failure: {0}")]
    Environment(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Compiler: Send + Sync {
    async fn build(
        &self,
        source: &SourceUnit,
        workspace: &Workspace,
    ) -> Result<Artifact, CompileError>;
}

/// Compiles C submissions by invoking an external gcc.
///
/// Submissions are arbitrary untrusted text, so nothing the toolchain reports
/// is taken on faith: the written source is re-read before compiling and the
/// artifact's existence is checked after a zero exit.
#[derive(Debug)]
pub struct GccCompiler {
    gcc_path: PathBuf,
    timeout: Duration,
}

impl GccCompiler {
    pub fn new(gcc_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            gcc_path: gcc_path.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Compiler for GccCompiler {
    async fn build(
        &self,
        source: &SourceUnit,
        workspace: &Workspace,
    ) -> Result<Artifact, CompileError> {
        match source.language {
            Language::C99 => self.build_c99(source, workspace).await,
        }
    }
}

impl GccCompiler {
    async fn build_c99(
        &self,
        source: &SourceUnit,
        workspace: &Workspace,
    ) -> Result<Artifact, CompileError> {
        fs::write(workspace.source_path(), &source.code)
            .await
            .map_err(|e| {
                CompileError::Environment(format!(
                    "failed to write source to {}: {e}",
                    workspace.source_path().display()
                ))
            })?;

        // Guard against partial-write corruption before handing the file to gcc.
        let written = fs::read_to_string(workspace.source_path())
            .await
            .map_err(|e| {
                CompileError::Environment(format!("failed to re-read written source: {e}"))
            })?;
        if written != source.code {
            return Err(CompileError::Environment(
                "source file content mismatch after write".to_string(),
            ));
        }

        let mut cmd = Command::new(&self.gcc_path);
        cmd.arg(workspace.source_path())
            .arg("-o")
            .arg(workspace.artifact_path())
            .arg("-std=c99")
            .arg("-Wall")
            .arg("-Wextra")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            CompileError::Environment(format!(
                "failed to start compiler {}: {e}",
                self.gcc_path.display()
            ))
        })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(waited) => waited.map_err(|e| {
                CompileError::Environment(format!("failed to wait for compiler: {e}"))
            })?,
            Err(_) => {
                // kill_on_drop reaps the compiler; the submission just failed.
                tracing::warn!(
                    workspace = %workspace.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "compilation timed out"
                );
                return Err(CompileError::Failed {
                    diagnostic: format!(
                        "compilation timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = clean_diagnostics(&stderr, output.status.code().unwrap_or(-1));
            tracing::debug!(workspace = %workspace.id(), %diagnostic, "compilation failed");
            return Err(CompileError::Failed { diagnostic });
        }

        // A zero exit with no artifact on disk is a toolchain misconfiguration,
        // not a bad submission.
        if !fs::try_exists(workspace.artifact_path()).await.unwrap_or(false) {
            return Err(CompileError::Environment(format!(
                "compiler reported success but produced no artifact at {}",
                workspace.artifact_path().display()
            )));
        }

        tracing::debug!(workspace = %workspace.id(), "compilation succeeded");
        Ok(Artifact {
            path: workspace.artifact_path().to_path_buf(),
        })
    }
}

/// Reduces raw compiler stderr to something worth showing a student:
/// keep the `error:` lines, otherwise the stderr minus preprocessor line
/// markers, otherwise a synthesized exit-code message.
fn clean_diagnostics(stderr: &str, exit_code: i32) -> String {
    let error_lines: Vec<&str> = stderr
        .lines()
        .filter(|line| line.contains("error:") || line.contains("fatal error:"))
        .collect();
    if !error_lines.is_empty() {
        return error_lines.join("\n");
    }

    let cleaned = stderr
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let cleaned = cleaned.trim();
    if !cleaned.is_empty() {
        return cleaned.to_string();
    }

    format!("compilation failed with exit code {exit_code}")
}
