//! Stage-status listener for the build server.
//!
//! This crate provides:
//! - Stage-status event decoding
//! - A concurrent registry of failing pipeline stages
//! - Failure/recovery evaluation with duplicate suppression
//! - The request handler that reports back to the build server
//! - HTTP server for the notification endpoints (standalone service)

pub mod config;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod handler;
pub mod registry;
pub mod server;

pub use config::Config;
pub use error::EvaluationError;
pub use evaluator::{evaluate, Action};
pub use event::{PipelineStageKey, StageState, StageStatusEvent};
pub use handler::{HandlerResponse, ResponseStatus, StageStatusHandler};
pub use registry::{FailingStage, FailureRegistry};
