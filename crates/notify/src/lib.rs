//! Chat notifications for pipeline stage transitions.
//!
//! This crate turns a decided stage transition (a stage started failing, or a
//! failing stage recovered) into a single webhook call against a chat robot
//! endpoint. Delivery is best-effort: every failure is logged and swallowed.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{NotificationKind, Notifier, NotifySettings, StageNotification};
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let settings = NotifySettings::from_env();
//! let notifier = Notifier::new(settings.timeout)?;
//!
//! notifier
//!     .notify(
//!         &StageNotification {
//!             kind: NotificationKind::Failing,
//!             pipeline: "build".to_string(),
//!             pipeline_counter: "5".to_string(),
//!             stage: "unit-tests".to_string(),
//!             stage_counter: "1".to_string(),
//!             state: "Failed".to_string(),
//!         },
//!         &settings,
//!     )
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `NOTIFY_API_URL`: chat webhook endpoint
//! - `NOTIFY_API_USER`: sender identity shown in each message
//! - `GO_SERVER_URL`: build server base URL used for run links
//! - `NOTIFY_FAILURE_ICON_URL` / `NOTIFY_RECOVERY_ICON_URL`: optional icon overrides
//! - `NOTIFY_TIMEOUT_SECS`: outbound request timeout (default 5)
//!
//! Leaving any of the first three unset disables notifications.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;
pub mod settings;

pub use channels::link::LinkChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use events::{NotificationKind, StageNotification};
pub use settings::{NotifySettings, SettingsProblem};

use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Notification dispatcher.
///
/// Holds one pooled HTTP client with a bounded timeout. Settings are passed
/// per call so they can change without rebuilding the notifier.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    /// Create a notifier whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Send a notification and wait for the webhook call to finish.
    ///
    /// Incomplete settings make this a no-op. Errors are logged but not
    /// propagated to the caller.
    pub async fn notify(&self, notification: &StageNotification, settings: &NotifySettings) {
        if !settings.is_complete() {
            info!(
                api_url = ?settings.api_url,
                api_user = ?settings.api_user,
                go_server_url = ?settings.go_server_url,
                "Notification settings incomplete, skipping"
            );
            return;
        }

        match self.try_notify(notification, settings).await {
            Ok(()) => {
                debug!(
                    kind = notification.kind.as_str(),
                    pipeline = %notification.pipeline,
                    stage = %notification.stage,
                    "Notification sent"
                );
            }
            Err(e @ ChannelError::Status { .. }) => {
                warn!(
                    pipeline = %notification.pipeline,
                    stage = %notification.stage,
                    error = %e,
                    "Notification rejected by webhook"
                );
            }
            Err(e) => {
                error!(
                    pipeline = %notification.pipeline,
                    stage = %notification.stage,
                    error = %e,
                    "Failed to send notification"
                );
            }
        }
    }

    /// Send a notification and return the outcome.
    ///
    /// Unlike `notify()`, this surfaces the channel error. Useful for tests
    /// and diagnostics.
    pub async fn try_notify(
        &self,
        notification: &StageNotification,
        settings: &NotifySettings,
    ) -> Result<(), ChannelError> {
        if let Some(key) = settings.missing_key() {
            return Err(ChannelError::NotConfigured(key.to_string()));
        }

        let channel = LinkChannel::from_settings(settings, self.client.clone());
        channel.send(notification).await
    }
}
