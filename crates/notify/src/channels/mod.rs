//! Notification channel implementations.

pub mod link;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::events::StageNotification;

/// Trait for notification channels.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Send a notification to this channel.
    async fn send(&self, notification: &StageNotification) -> Result<(), ChannelError>;
}
