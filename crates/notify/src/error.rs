//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed (connect, timeout, TLS, DNS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A required setting is missing; carries the setting key
    #[error("Setting not configured: {0}")]
    NotConfigured(String),

    /// Webhook answered with a non-success status
    #[error("Webhook returned HTTP {status}")]
    Status { status: u16 },
}
