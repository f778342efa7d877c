use std::panic;

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::domain::{SourceUnit, TestCase, partition_by_visibility};
use crate::grader::Grader;

mod compiler;
mod config;
mod domain;
mod error;
mod grader;
mod runner;
mod workspace;


const DEMO_SOURCE: &str = "\
#include <stdio.h>

int main(void) {
    int n;
    if (scanf(\"%d\", &n) != 1) {
        return 1;
    }
    printf(\"%d\\n\", n + 1);
    return 0;
}
";

/// Demo wiring: evaluates a sample submission the way the platform's
/// final-submission endpoint would, with the visible cases ordered before
/// the hidden one.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let config = EngineConfig::from_env();
    tracing::info!(
        gcc = %config.gcc_path.display(),
        scratch = %config.scratch_dir.display(),
        "starting demo evaluation"
    );

    let grader = Grader::from_config(&config);
    let source = SourceUnit::c99(DEMO_SOURCE);
    let test_cases = vec![
        TestCase {
            input: "4".to_string(),
            expected_output: "5".to_string(),
            visible: true,
        },
        TestCase {
            input: "41".to_string(),
            expected_output: "42".to_string(),
            visible: true,
        },
        TestCase {
            input: "-1".to_string(),
            expected_output: "0".to_string(),
            visible: true,
        },
        TestCase {
            input: "99".to_string(),
            expected_output: "100".to_string(),
            visible: false,
        },
    ];

    let result = grader.evaluate(&source, &test_cases).await?;

    if !result.compilation_success {
        tracing::error!(
            error = result.compilation_error.as_deref().unwrap_or("unknown"),
            "demo submission failed to compile"
        );
        return Ok(());
    }

    let (visible, hidden) = partition_by_visibility(&test_cases, &result.results);
    for (idx, case_result) in visible.iter().enumerate() {
        tracing::info!(
            test = idx + 1,
            passed = case_result.passed,
            actual = %case_result.actual,
            "visible test case"
        );
    }
    tracing::info!(
        hidden_passed = hidden.iter().filter(|r| r.passed).count(),
        hidden_total = hidden.len(),
        score = result.score,
        passed = result.all_passed(),
        "demo evaluation finished"
    );

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
