//! Link-message webhook channel.
//!
//! Posts a `msgtype: link` card to a chat robot endpoint. The card points at
//! the exact pipeline run that triggered it.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::events::{NotificationKind, StageNotification};
use crate::settings::NotifySettings;
use crate::NotifyChannel;

/// Link-message webhook channel.
pub struct LinkChannel {
    webhook_url: Option<String>,
    missing_key: Option<&'static str>,
    sender: String,
    server_url: String,
    failure_icon_url: String,
    recovery_icon_url: String,
    client: reqwest::Client,
}

impl LinkChannel {
    /// Create a channel from settings, sharing an existing HTTP client.
    ///
    /// The channel is disabled unless the settings are complete.
    #[must_use]
    pub fn from_settings(settings: &NotifySettings, client: reqwest::Client) -> Self {
        let resolved = settings.resolved();

        Self {
            webhook_url: resolved.map(|r| r.api_url.to_string()),
            missing_key: settings.missing_key(),
            sender: resolved.map(|r| r.api_user.to_string()).unwrap_or_default(),
            server_url: resolved
                .map(|r| r.go_server_url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            failure_icon_url: settings.failure_icon_url.clone(),
            recovery_icon_url: settings.recovery_icon_url.clone(),
            client,
        }
    }

    /// Format a notification as a link-message payload.
    #[must_use]
    pub fn format_payload(&self, notification: &StageNotification) -> LinkPayload {
        let pic_url = match notification.kind {
            NotificationKind::Failing => &self.failure_icon_url,
            NotificationKind::Recovered => &self.recovery_icon_url,
        };

        LinkPayload {
            msgtype: "link",
            link: LinkMessage {
                text: format!("{} - {}", self.sender, notification.kind.message()),
                title: notification.title(),
                pic_url: pic_url.clone(),
                message_url: format!(
                    "{}/go/pipelines/{}",
                    self.server_url,
                    notification.run_path()
                ),
            },
        }
    }
}

#[async_trait]
impl NotifyChannel for LinkChannel {
    fn name(&self) -> &'static str {
        "link"
    }

    fn enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, notification: &StageNotification) -> Result<(), ChannelError> {
        let webhook_url = self
            .webhook_url
            .as_ref()
            .ok_or_else(|| {
                ChannelError::NotConfigured(self.missing_key.unwrap_or("api_url").to_string())
            })?;

        let payload = self.format_payload(notification);

        debug!(
            channel = "link",
            kind = notification.kind.as_str(),
            title = %payload.link.title,
            "Sending notification"
        );

        let response = self.client.post(webhook_url).json(&payload).send().await?;
        let status = response.status();

        // Drain the body so the connection can be reused; its content is not inspected.
        response.bytes().await?;

        if status.is_success() {
            debug!(channel = "link", "Notification sent successfully");
            Ok(())
        } else {
            warn!(
                channel = "link",
                status = %status,
                "Link webhook request failed"
            );
            Err(ChannelError::Status {
                status: status.as_u16(),
            })
        }
    }
}

// =============================================================================
// Link message wire types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LinkPayload {
    pub msgtype: &'static str,
    pub link: LinkMessage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMessage {
    pub text: String,
    pub title: String,
    pub pic_url: String,
    pub message_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification(kind: NotificationKind, state: &str) -> StageNotification {
        StageNotification {
            kind,
            pipeline: "build".to_string(),
            pipeline_counter: "5".to_string(),
            stage: "unit-tests".to_string(),
            stage_counter: "1".to_string(),
            state: state.to_string(),
        }
    }

    fn channel(api_url: &str) -> LinkChannel {
        let settings = NotifySettings::new(api_url, "gocd", "https://ci.example.com/");
        LinkChannel::from_settings(&settings, reqwest::Client::new())
    }

    #[test]
    fn test_failure_payload() {
        let payload = channel("https://chat.example.com/send")
            .format_payload(&notification(NotificationKind::Failing, "Failed"));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "msgtype": "link",
                "link": {
                    "text": "gocd - Fix the pipeline please!",
                    "title": "Pipeline build stage unit-tests Failed",
                    "picUrl": crate::settings::DEFAULT_FAILURE_ICON_URL,
                    "messageUrl": "https://ci.example.com/go/pipelines/build/5/unit-tests/1"
                }
            })
        );
    }

    #[test]
    fn test_recovery_payload_uses_recovery_icon() {
        let payload = channel("https://chat.example.com/send")
            .format_payload(&notification(NotificationKind::Recovered, "Passed"));

        assert_eq!(payload.link.text, "gocd - Nice! Someone has fixed the pipeline!");
        assert_eq!(payload.link.pic_url, crate::settings::DEFAULT_RECOVERY_ICON_URL);
    }

    #[test]
    fn test_incomplete_settings_disable_channel() {
        let settings = NotifySettings {
            api_user: None,
            ..NotifySettings::new("https://chat.example.com/send", "x", "https://ci")
        };
        let channel = LinkChannel::from_settings(&settings, reqwest::Client::new());
        assert!(!channel.enabled());
    }

    #[tokio::test]
    async fn test_send_while_disabled_names_missing_setting() {
        let settings = NotifySettings {
            api_user: None,
            ..NotifySettings::new("https://chat.example.com/send", "gocd", "https://ci")
        };
        let channel = LinkChannel::from_settings(&settings, reqwest::Client::new());

        let err = channel
            .send(&notification(NotificationKind::Failing, "Failed"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(ref key) if key == "api_user"));
    }

    #[tokio::test]
    async fn test_send_without_endpoint_names_setting() {
        let settings = NotifySettings {
            api_url: None,
            ..NotifySettings::new("https://chat.example.com/send", "gocd", "https://ci")
        };
        let channel = LinkChannel::from_settings(&settings, reqwest::Client::new());

        let err = channel
            .send(&notification(NotificationKind::Failing, "Failed"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(ref key) if key == "api_url"));
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/robot/send"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "msgtype": "link",
                "link": {
                    "text": "gocd - Fix the pipeline please!",
                    "title": "Pipeline build stage unit-tests Failed",
                    "picUrl": crate::settings::DEFAULT_FAILURE_ICON_URL,
                    "messageUrl": "https://ci.example.com/go/pipelines/build/5/unit-tests/1"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errcode":0}"#))
            .expect(1)
            .mount(&server)
            .await;

        channel(&format!("{}/robot/send", server.uri()))
            .send(&notification(NotificationKind::Failing, "Failed"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_reports_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = channel(&server.uri())
            .send(&notification(NotificationKind::Failing, "Failed"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Status { status: 502 }));
    }
}
