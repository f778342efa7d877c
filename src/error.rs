use thiserror::Error;

/// Faults that abort an evaluation instead of producing a verdict.
///
/// Everything a student can cause (compile errors, runtime errors, timeouts)
/// is reported inside [`crate::domain::EvaluationResult`] and never surfaces
/// here. `Environment` means the platform itself is broken and the caller
/// should answer with a generic "grading service unavailable" message.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("grading environment failure: {0}")]
    Environment(String),
}
