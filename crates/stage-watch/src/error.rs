//! Error types for stage-status evaluation.

use thiserror::Error;

/// Errors raised while turning a host request into an evaluable event.
///
/// These are the only failures reported back to the build server.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Request body is not a stage-status event
    #[error("Malformed stage-status event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The event names a pipeline but carries no stage
    #[error("Stage-status event for pipeline '{pipeline}' has no stage")]
    MissingStage { pipeline: String },
}
