//! Webhook settings supplied by the operator.
//!
//! Settings are read-only for the lifetime of a call. A missing or empty
//! endpoint, sender, or server URL disables notification; it is never an
//! error.

use serde::Serialize;
use std::time::Duration;

/// Environment variable for the chat webhook endpoint.
pub const ENV_API_URL: &str = "NOTIFY_API_URL";
/// Environment variable for the sender identity shown in messages.
pub const ENV_API_USER: &str = "NOTIFY_API_USER";
/// Environment variable for the build server base URL used in links.
pub const ENV_GO_SERVER_URL: &str = "GO_SERVER_URL";
/// Environment variable overriding the failure icon.
pub const ENV_FAILURE_ICON_URL: &str = "NOTIFY_FAILURE_ICON_URL";
/// Environment variable overriding the recovery icon.
pub const ENV_RECOVERY_ICON_URL: &str = "NOTIFY_RECOVERY_ICON_URL";
/// Environment variable for the outbound request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "NOTIFY_TIMEOUT_SECS";

pub const DEFAULT_FAILURE_ICON_URL: &str =
    "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/72x72/274c.png";
pub const DEFAULT_RECOVERY_ICON_URL: &str =
    "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/72x72/2705.png";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    /// Chat webhook endpoint
    pub api_url: Option<String>,
    /// Sender identity prefixed to every message
    pub api_user: Option<String>,
    /// Build server base URL for run links
    pub go_server_url: Option<String>,
    pub failure_icon_url: String,
    pub recovery_icon_url: String,
    /// Upper bound on a single webhook call
    pub timeout: Duration,
}

/// Borrowed view of settings that are complete enough to send with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSettings<'a> {
    pub api_url: &'a str,
    pub api_user: &'a str,
    pub go_server_url: &'a str,
}

/// A single settings validation problem, keyed by the setting name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsProblem {
    pub key: &'static str,
    pub message: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_user: None,
            go_server_url: None,
            failure_icon_url: DEFAULT_FAILURE_ICON_URL.to_string(),
            recovery_icon_url: DEFAULT_RECOVERY_ICON_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl NotifySettings {
    /// Create settings with all three required values set.
    #[must_use]
    pub fn new(
        api_url: impl Into<String>,
        api_user: impl Into<String>,
        go_server_url: impl Into<String>,
    ) -> Self {
        Self {
            api_url: Some(api_url.into()),
            api_user: Some(api_user.into()),
            go_server_url: Some(go_server_url.into()),
            ..Self::default()
        }
    }

    /// Load settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            api_url: get(ENV_API_URL),
            api_user: get(ENV_API_USER),
            go_server_url: get(ENV_GO_SERVER_URL),
            failure_icon_url: get(ENV_FAILURE_ICON_URL).unwrap_or(defaults.failure_icon_url),
            recovery_icon_url: get(ENV_RECOVERY_ICON_URL).unwrap_or(defaults.recovery_icon_url),
            timeout: get(ENV_TIMEOUT_SECS)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }

    /// Name of the first required setting that is missing or empty.
    #[must_use]
    pub fn missing_key(&self) -> Option<&'static str> {
        [
            ("api_url", &self.api_url),
            ("api_user", &self.api_user),
            ("go_server_url", &self.go_server_url),
        ]
        .into_iter()
        .find_map(|(key, value)| non_empty(value.as_deref()).is_none().then_some(key))
    }

    /// Return the required values if all of them are present and non-empty.
    #[must_use]
    pub fn resolved(&self) -> Option<ResolvedSettings<'_>> {
        Some(ResolvedSettings {
            api_url: non_empty(self.api_url.as_deref())?,
            api_user: non_empty(self.api_user.as_deref())?,
            go_server_url: non_empty(self.go_server_url.as_deref())?,
        })
    }

    /// Check whether notifications can be sent with these settings.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.resolved().is_some()
    }

    /// Validate the operator-facing settings.
    ///
    /// Returns an empty list when the settings are usable.
    #[must_use]
    pub fn validate(&self) -> Vec<SettingsProblem> {
        let mut problems = vec![];

        match non_empty(self.api_url.as_deref()) {
            None => problems.push(SettingsProblem {
                key: "api_url",
                message: "API URL must not be blank.".to_string(),
            }),
            Some(url) => {
                if let Err(message) = check_http_url(url) {
                    problems.push(SettingsProblem {
                        key: "api_url",
                        message,
                    });
                }
            }
        }

        if non_empty(self.api_user.as_deref()).is_none() {
            problems.push(SettingsProblem {
                key: "api_user",
                message: "API user must not be blank.".to_string(),
            });
        }

        match non_empty(self.go_server_url.as_deref()) {
            None => problems.push(SettingsProblem {
                key: "go_server_url",
                message: "Server URL must not be blank.".to_string(),
            }),
            Some(url) => {
                if let Err(message) = check_http_url(url) {
                    problems.push(SettingsProblem {
                        key: "go_server_url",
                        message,
                    });
                }
            }
        }

        problems
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(raw).map_err(|e| format!("'{raw}' is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("'{raw}' must use http or https, not {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_complete() {
        let settings = NotifySettings::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://chat.example.com/robot/send?access_token=abc"),
            (ENV_API_USER, "gocd"),
            (ENV_GO_SERVER_URL, "https://ci.example.com"),
            (ENV_TIMEOUT_SECS, "3"),
        ]));

        let resolved = settings.resolved().expect("settings should be complete");
        assert_eq!(resolved.api_user, "gocd");
        assert_eq!(resolved.go_server_url, "https://ci.example.com");
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.failure_icon_url, DEFAULT_FAILURE_ICON_URL);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let settings = NotifySettings::from_lookup(lookup_from(&[
            (ENV_API_URL, ""),
            (ENV_API_USER, "gocd"),
            (ENV_GO_SERVER_URL, "https://ci.example.com"),
            (ENV_TIMEOUT_SECS, "not-a-number"),
        ]));

        assert_eq!(settings.api_url, None);
        assert!(!settings.is_complete());
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let settings = NotifySettings::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "0")]));
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_missing_key_reports_first_gap() {
        let mut settings = NotifySettings::default();
        assert_eq!(settings.missing_key(), Some("api_url"));

        settings.api_url = Some("https://chat.example.com/send".to_string());
        settings.api_user = Some("  ".to_string());
        assert_eq!(settings.missing_key(), Some("api_user"));

        settings.api_user = Some("gocd".to_string());
        assert_eq!(settings.missing_key(), Some("go_server_url"));

        settings.go_server_url = Some("https://ci.example.com".to_string());
        assert_eq!(settings.missing_key(), None);
    }

    #[test]
    fn test_icon_overrides() {
        let settings = NotifySettings::from_lookup(lookup_from(&[
            (ENV_FAILURE_ICON_URL, "https://icons.example.com/red.png"),
            (ENV_RECOVERY_ICON_URL, "https://icons.example.com/green.png"),
        ]));

        assert_eq!(settings.failure_icon_url, "https://icons.example.com/red.png");
        assert_eq!(settings.recovery_icon_url, "https://icons.example.com/green.png");
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let mut settings = NotifySettings::default();
        let keys: Vec<_> = settings.validate().iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["api_url", "api_user", "go_server_url"]);

        settings.api_url = Some("ftp://chat.example.com".to_string());
        settings.api_user = Some("gocd".to_string());
        settings.go_server_url = Some("not a url".to_string());
        let problems = settings.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].message.contains("http or https"));
        assert_eq!(problems[1].key, "go_server_url");
    }

    #[test]
    fn test_validate_accepts_complete_settings() {
        let settings = NotifySettings::new(
            "https://chat.example.com/robot/send",
            "gocd",
            "http://ci.example.com:8153",
        );
        assert!(settings.validate().is_empty());
        assert!(settings.is_complete());
    }
}
