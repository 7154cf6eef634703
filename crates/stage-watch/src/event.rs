//! Stage-status events delivered by the build server.
//!
//! The host sends one event per stage state change:
//!
//! ```json
//! {
//!   "pipeline": {
//!     "name": "build",
//!     "counter": "5",
//!     "stage": { "name": "unit-tests", "counter": "1", "state": "Failed" }
//!   }
//! }
//! ```
//!
//! Counters arrive as strings from the host but numbers are accepted too.
//! Any other fields (group, build cause, timestamps) are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::EvaluationError;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct StageStatusRequest {
    pipeline: PipelinePayload,
}

#[derive(Debug, Clone, Deserialize)]
struct PipelinePayload {
    name: String,
    #[serde(default, deserialize_with = "counter")]
    counter: String,
    #[serde(default)]
    stage: Option<StagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
struct StagePayload {
    name: String,
    #[serde(default, deserialize_with = "counter")]
    counter: String,
    #[serde(default)]
    state: Option<String>,
}

fn counter<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

// =============================================================================
// Domain types
// =============================================================================

/// A single stage-status change, flattened from the host request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageStatusEvent {
    pub pipeline: String,
    pub pipeline_counter: String,
    pub stage: String,
    pub stage_counter: String,
    /// Raw state text, e.g. `Passed`, `Failed`, `Building`
    pub state: String,
}

impl StageStatusEvent {
    /// Decode a host request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, EvaluationError> {
        let request: StageStatusRequest = serde_json::from_slice(body)?;
        Self::from_request(request)
    }

    /// Decode an already-parsed host request.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EvaluationError> {
        let request: StageStatusRequest = serde_json::from_value(value)?;
        Self::from_request(request)
    }

    /// Identity used for failure tracking. Run counters are not part of it.
    #[must_use]
    pub fn key(&self) -> PipelineStageKey {
        PipelineStageKey::new(&self.pipeline, &self.stage)
    }

    #[must_use]
    pub fn classify(&self) -> StageState {
        StageState::classify(&self.state)
    }

    fn from_request(request: StageStatusRequest) -> Result<Self, EvaluationError> {
        let PipelinePayload {
            name,
            counter,
            stage,
        } = request.pipeline;

        let Some(stage) = stage else {
            return Err(EvaluationError::MissingStage { pipeline: name });
        };

        Ok(Self {
            pipeline: name,
            pipeline_counter: counter,
            stage: stage.name,
            stage_counter: stage.counter,
            state: stage.state.unwrap_or_default(),
        })
    }
}

/// Coarse meaning of a stage state string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Passed,
    Failed,
    /// Building, cancelled, unknown, or empty
    Other,
}

impl StageState {
    /// Classify by case-insensitive substring: `passed` wins over `failed`.
    #[must_use]
    pub fn classify(state: &str) -> Self {
        let state = state.to_lowercase();
        if state.contains("passed") {
            Self::Passed
        } else if state.contains("failed") {
            Self::Failed
        } else {
            Self::Other
        }
    }
}

/// Pipeline and stage name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PipelineStageKey {
    pub pipeline: String,
    pub stage: String,
}

impl PipelineStageKey {
    #[must_use]
    pub fn new(pipeline: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            stage: stage.into(),
        }
    }
}

impl fmt::Display for PipelineStageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.pipeline, self.stage)
    }
}
