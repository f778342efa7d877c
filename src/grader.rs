use std::sync::Arc;
use std::time::Duration;

use crate::compiler::{Artifact, CompileError, Compiler, GccCompiler};
use crate::config::EngineConfig;
use crate::domain::{EvaluationResult, SourceUnit, TestCase, TestCaseResult};
use crate::error::EngineError;
use crate::runner::{NativeRunner, RunError, Runner};
use crate::workspace::WorkspaceManager;

/// Orchestrates one full build+run+grade cycle per submission.
///
/// Holds no mutable state; any number of `evaluate` calls may be in flight
/// concurrently, each with its own workspace. Within one call, test cases run
/// strictly sequentially so per-case timing stays deterministic and one
/// submission never holds more than one live child process.
#[derive(Clone)]
pub struct Grader {
    workspaces: WorkspaceManager,
    compiler: Arc<dyn Compiler>,
    runner: Arc<dyn Runner>,
    run_timeout: Duration,
}

impl Grader {
    pub fn new(
        workspaces: WorkspaceManager,
        compiler: Arc<dyn Compiler>,
        runner: Arc<dyn Runner>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            workspaces,
            compiler,
            runner,
            run_timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            WorkspaceManager::new(&config.scratch_dir),
            Arc::new(GccCompiler::new(&config.gcc_path, config.compile_timeout)),
            Arc::new(NativeRunner::new()),
            config.run_timeout,
        )
    }

    /// Evaluates a submission against an ordered test case list.
    ///
    /// Compile errors, runtime errors, and timeouts all come back inside the
    /// `EvaluationResult`; `Err` is reserved for rejected input and for
    /// platform faults the caller must not show to the student verbatim.
    #[tracing::instrument(skip_all, fields(test_count = test_cases.len()))]
    pub async fn evaluate(
        &self,
        source: &SourceUnit,
        test_cases: &[TestCase],
    ) -> Result<EvaluationResult, EngineError> {
        if source.code.trim().is_empty() {
            return Err(EngineError::Validation("source code is empty".to_string()));
        }
        if test_cases.is_empty() {
            return Err(EngineError::Validation("no test cases to run".to_string()));
        }

        // Released on every exit path below, including Err returns and panics.
        let workspace = self.workspaces.acquire().await?;

        let artifact = match self.compiler.build(source, &workspace).await {
            Ok(artifact) => artifact,
            Err(CompileError::Failed { diagnostic }) => {
                tracing::info!(workspace = %workspace.id(), "compilation failed");
                return Ok(EvaluationResult::compile_failure(
                    diagnostic,
                    test_cases.len(),
                ));
            }
            Err(CompileError::Environment(msg)) => {
                return Err(EngineError::Environment(msg));
            }
        };

        let mut results = Vec::with_capacity(test_cases.len());
        for case in test_cases {
            results.push(self.run_case(&artifact, case).await);
        }

        let passed_count = results.iter().filter(|r| r.passed).count();
        let total_count = results.len();
        let score = ((passed_count as f64 / total_count as f64) * 100.0).round() as u8;

        tracing::info!(
            workspace = %workspace.id(),
            passed_count,
            total_count,
            score,
            "evaluation finished"
        );

        Ok(EvaluationResult {
            compilation_success: true,
            compilation_error: None,
            results,
            passed_count,
            total_count,
            score,
        })
    }

    /// One bad test case never aborts the rest: every failure mode degrades
    /// to `passed: false` with a human-readable `actual`.
    async fn run_case(&self, artifact: &Artifact, case: &TestCase) -> TestCaseResult {
        match self
            .runner
            .run_once(artifact, &case.input, self.run_timeout)
            .await
        {
            Ok(outcome) if outcome.timed_out => TestCaseResult {
                input: case.input.clone(),
                expected: case.expected_output.clone(),
                actual: format!(
                    "Program execution timed out after {}ms",
                    self.run_timeout.as_millis()
                ),
                passed: false,
                execution_time_ms: None,
            },
            Ok(outcome) if outcome.exit_code != 0 => {
                let mut actual = format!(
                    "Runtime error: program exited with code {}",
                    outcome.exit_code
                );
                let stderr = outcome.stderr.trim();
                if !stderr.is_empty() {
                    actual.push_str(": ");
                    actual.push_str(stderr);
                }
                TestCaseResult {
                    input: case.input.clone(),
                    expected: case.expected_output.clone(),
                    actual,
                    passed: false,
                    execution_time_ms: None,
                }
            }
            Ok(outcome) => {
                // Trailing-whitespace-insensitive, internal-whitespace-sensitive.
                let actual = outcome.stdout.trim().to_string();
                let passed = actual == case.expected_output.trim();
                TestCaseResult {
                    input: case.input.clone(),
                    expected: case.expected_output.clone(),
                    actual,
                    passed,
                    execution_time_ms: Some(outcome.duration_ms),
                }
            }
            Err(RunError::FailedToLaunch { msg }) => TestCaseResult {
                input: case.input.clone(),
                expected: case.expected_output.clone(),
                actual: format!("Failed to run program: {msg}"),
                passed: false,
                execution_time_ms: None,
            },
        }
    }
}
