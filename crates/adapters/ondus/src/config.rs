//! Ondus platform configuration.

use serde::Deserialize;

/// Default Ondus API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://idp-apigw.cloud.grohe.com/v3/iot";

/// Polling interval used when none (or zero) is configured.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Configuration for the Ondus platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OndusConfig {
    /// Root of the Ondus REST API.
    pub base_url: String,
    /// Long-lived refresh token. When absent, `username`/`password` are used
    /// to obtain one through the login form.
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// How often each appliance is polled, in seconds.
    pub refresh_interval_secs: u64,
    /// Allow the valve of a Sense Guard to be opened and closed.
    pub valve_control: bool,
    /// Log every raw API response body at `debug` level.
    pub dump_responses: bool,
    /// Keep a measurement history per accessory. The full cloud history is
    /// replayed once at startup, then every fetched sample is added.
    pub history: bool,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for OndusConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_token: None,
            username: None,
            password: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            valve_control: false,
            dump_responses: false,
            history: false,
            request_timeout_secs: 30,
        }
    }
}

impl OndusConfig {
    /// Whether both username and password are set.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Whether a refresh token is set.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Polling interval, replacing an unset value with the default.
    #[must_use]
    pub fn effective_refresh_interval_secs(&self) -> u64 {
        if self.refresh_interval_secs == 0 {
            tracing::warn!(
                default = DEFAULT_REFRESH_INTERVAL_SECS,
                "refresh interval is not configured, using default"
            );
            DEFAULT_REFRESH_INTERVAL_SECS
        } else {
            self.refresh_interval_secs
        }
    }
}
