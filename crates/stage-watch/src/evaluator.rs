//! Decides whether a stage-status event is worth a notification.
//!
//! - first failure of a pipeline stage: notify failure
//! - further failures while still failing: suppressed
//! - first pass after a recorded failure: notify recovery
//! - anything else: nothing
//!
//! Run counters are ignored when matching a recovery to its failure.

use chrono::Utc;
use notify::{NotificationKind, StageNotification};
use tracing::{debug, info};

use crate::event::{StageState, StageStatusEvent};
use crate::registry::FailureRegistry;

/// Outcome of evaluating one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    NotifyFailure(StageStatusEvent),
    NotifyRecovery(StageStatusEvent),
}

impl Action {
    /// Build the notification this action calls for, if any.
    #[must_use]
    pub fn notification(&self) -> Option<StageNotification> {
        let (kind, event) = match self {
            Self::None => return None,
            Self::NotifyFailure(event) => (NotificationKind::Failing, event),
            Self::NotifyRecovery(event) => (NotificationKind::Recovered, event),
        };

        Some(StageNotification {
            kind,
            pipeline: event.pipeline.clone(),
            pipeline_counter: event.pipeline_counter.clone(),
            stage: event.stage.clone(),
            stage_counter: event.stage_counter.clone(),
            state: event.state.clone(),
        })
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Classify `event` and update `registry` accordingly.
pub fn evaluate(event: StageStatusEvent, registry: &FailureRegistry) -> Action {
    let key = event.key();

    match event.classify() {
        StageState::Passed => match registry.clear(&key) {
            Some(since) => {
                let failing_for = Utc::now() - since;
                info!(
                    key = %key,
                    counter = %event.pipeline_counter,
                    failing_secs = failing_for.num_seconds(),
                    "Stage recovered"
                );
                Action::NotifyRecovery(event)
            }
            None => {
                debug!(key = %key, "Stage passed, no failure on record");
                Action::None
            }
        },
        StageState::Failed => {
            if registry.mark_failing(key.clone()) {
                info!(
                    key = %key,
                    counter = %event.pipeline_counter,
                    state = %event.state,
                    "Stage started failing"
                );
                Action::NotifyFailure(event)
            } else {
                debug!(key = %key, "Stage already failing, suppressing duplicate");
                Action::None
            }
        }
        StageState::Other => {
            debug!(key = %key, state = %event.state, "Ignoring stage state");
            Action::None
        }
    }
}
