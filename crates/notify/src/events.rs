//! Notification event types for pipeline stage transitions.

/// Which transition a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A stage started failing
    Failing,
    /// A previously failing stage passed again
    Recovered,
}

impl NotificationKind {
    /// Short human message sent with the notification.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Failing => "Fix the pipeline please!",
            Self::Recovered => "Nice! Someone has fixed the pipeline!",
        }
    }

    /// Get display name for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Failing => "failing",
            Self::Recovered => "recovered",
        }
    }
}

/// A decided stage transition, ready to be formatted by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNotification {
    pub kind: NotificationKind,
    pub pipeline: String,
    pub pipeline_counter: String,
    pub stage: String,
    pub stage_counter: String,
    /// Raw stage state as reported by the build server
    pub state: String,
}

impl StageNotification {
    /// Get a short title for this notification.
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "Pipeline {} stage {} {}",
            self.pipeline, self.stage, self.state
        )
    }

    /// Path segment identifying the exact run, relative to the server's
    /// pipelines page.
    #[must_use]
    pub fn run_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.pipeline, self.pipeline_counter, self.stage, self.stage_counter
        )
    }
}
