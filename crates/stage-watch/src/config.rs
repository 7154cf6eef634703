//! Configuration for the stage-watch service.

use notify::NotifySettings;
use std::env;

/// Environment variable for the HTTP listen port.
pub const ENV_PORT: &str = "STAGE_WATCH_PORT";

const DEFAULT_PORT: u16 = 8090;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Chat webhook settings.
    pub notify: NotifySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }
}

impl Config {
    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            port: lookup(ENV_PORT)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            notify: NotifySettings::from_lookup(&lookup),
        }
    }
}
