/// Languages the engine can grade. The platform currently only teaches C,
/// but the enum keeps the seam open the same way the compiler/runner traits do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    C99,
}

/// A student's submitted program, immutable once received.
#[derive(Clone, Debug)]
pub struct SourceUnit {
    pub code: String,
    pub language: Language,
}

impl SourceUnit {
    pub fn c99(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: Language::C99,
        }
    }
}

/// One input/expected-output pair. Ordering within the submitted list is
/// significant: visible cases come first and the caller reconstructs the
/// visible/hidden split from the original indices.
#[derive(Clone, Debug)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct TestCaseResult {
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    /// `None` when the program never produced a comparable run
    /// (timeout, runtime error, failed launch).
    pub execution_time_ms: Option<u64>,
}

/// The full verdict for one evaluation. Score and counts are always computed
/// over every test case that was run; slicing out the visible prefix for the
/// student is the caller's policy, supported by [`EvaluationResult::visible_results`].
#[derive(Clone, Debug)]
pub struct EvaluationResult {
    pub compilation_success: bool,
    pub compilation_error: Option<String>,
    pub results: Vec<TestCaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
    /// 0..=100, rounded percentage of passed cases.
    pub score: u8,
}

impl EvaluationResult {
    /// Terminal result for a submission that never built. No test case is
    /// executed against unbuilt code, so `results` is always empty here.
    pub fn compile_failure(diagnostic: String, total_count: usize) -> Self {
        Self {
            compilation_success: false,
            compilation_error: Some(diagnostic),
            results: Vec::new(),
            passed_count: 0,
            total_count,
            score: 0,
        }
    }

    /// Binary verdict: a submission passes only when every test case,
    /// visible and hidden, passed. Partial credit lives in `score` alone.
    pub fn all_passed(&self) -> bool {
        self.compilation_success && self.total_count > 0 && self.passed_count == self.total_count
    }

    /// Leading slice covering the visible test cases, which by platform
    /// convention are ordered before the hidden ones.
    pub fn visible_results(&self, visible_count: usize) -> &[TestCaseResult] {
        &self.results[..visible_count.min(self.results.len())]
    }
}

/// Stable partition of results by the `visible` flag of the originating test
/// case. Relative order within each partition follows the original indices.
pub fn partition_by_visibility(
    cases: &[TestCase],
    results: &[TestCaseResult],
) -> (Vec<TestCaseResult>, Vec<TestCaseResult>) {
    debug_assert_eq!(cases.len(), results.len());

    let mut visible = Vec::new();
    let mut hidden = Vec::new();
    for (case, result) in cases.iter().zip(results) {
        if case.visible {
            visible.push(result.clone());
        } else {
            hidden.push(result.clone());
        }
    }
    (visible, hidden)
}
