//! Stage-status request handling.
//!
//! The handler is the only place a failure can be reported back to the build
//! server. It always produces a well-formed response.

use notify::{Notifier, NotifySettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::evaluator::evaluate;
use crate::event::StageStatusEvent;
use crate::registry::FailureRegistry;

/// Response status reported to the build server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// Response envelope expected by the build server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl HandlerResponse {
    #[must_use]
    pub const fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failure,
            messages: vec![message.into()],
        }
    }
}

/// Evaluates stage-status events and dispatches the resulting notifications.
pub struct StageStatusHandler {
    registry: Arc<FailureRegistry>,
    notifier: Notifier,
}

impl StageStatusHandler {
    #[must_use]
    pub const fn new(registry: Arc<FailureRegistry>, notifier: Notifier) -> Self {
        Self { registry, notifier }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<FailureRegistry> {
        &self.registry
    }

    /// Handle a raw stage-status request body.
    pub async fn handle(&self, body: &[u8], settings: &NotifySettings) -> HandlerResponse {
        match StageStatusEvent::from_slice(body) {
            Ok(event) => self.handle_event(event, settings).await,
            Err(e) => {
                warn!(error = %e, "Rejecting stage-status event");
                HandlerResponse::failure(e.to_string())
            }
        }
    }

    /// Handle an already decoded event.
    ///
    /// Notification delivery never fails the request.
    pub async fn handle_event(
        &self,
        event: StageStatusEvent,
        settings: &NotifySettings,
    ) -> HandlerResponse {
        let action = evaluate(event, &self.registry);

        if let Some(notification) = action.notification() {
            self.notifier.notify(&notification, settings).await;
        }

        HandlerResponse::success()
    }
}
