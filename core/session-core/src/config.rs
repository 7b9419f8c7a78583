//! Session configuration loading.
//!
//! Every field has a default, so a missing file means "use the observed
//! production values": 15 minute inactivity window, 30 second poll.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use session_contract::route_path;

use crate::error::{Result, SessionError};
use crate::types::ActivityKind;

pub const DEFAULT_SESSION_DURATION_MS: u64 = 15 * 60 * 1000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30 * 1000;

fn default_session_duration_ms() -> u64 {
    DEFAULT_SESSION_DURATION_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_landing_route() -> String {
    "/dashboard".to_string()
}

fn default_public_routes() -> Vec<String> {
    ["/login", "/register", "/forgot-password", "/reset-password"]
        .iter()
        .map(|route| route.to_string())
        .collect()
}

fn default_activity_events() -> Vec<ActivityKind> {
    ActivityKind::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity window after which an authenticated session is expired.
    #[serde(default = "default_session_duration_ms")]
    pub session_duration_ms: u64,
    /// Period of the expiry poll.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_login_route")]
    pub login_route: String,
    #[serde(default = "default_landing_route")]
    pub landing_route: String,
    /// Routes that never trigger the expiry redirect at startup.
    #[serde(default = "default_public_routes")]
    pub public_routes: Vec<String>,
    #[serde(default = "default_activity_events")]
    pub activity_events: Vec<ActivityKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_duration_ms: default_session_duration_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            login_route: default_login_route(),
            landing_route: default_landing_route(),
            public_routes: default_public_routes(),
            activity_events: default_activity_events(),
        }
    }
}

impl SessionConfig {
    pub fn session_duration(&self) -> Duration {
        Duration::from_millis(self.session_duration_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session_duration_millis(&self) -> i64 {
        i64::try_from(self.session_duration_ms).unwrap_or(i64::MAX)
    }

    pub fn is_public_route(&self, location: &str) -> bool {
        let path = route_path(location);
        self.public_routes.iter().any(|route| route == path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_duration_ms == 0 {
            return Err(SessionError::ConfigInvalid(
                "session_duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SessionError::ConfigInvalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.login_route.starts_with('/') || !self.landing_route.starts_with('/') {
            return Err(SessionError::ConfigInvalid(
                "login_route and landing_route must be absolute paths".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, returning defaults if it doesn't exist.
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        return Ok(SessionConfig::default());
    }

    let content =
        fs_err::read_to_string(path).map_err(|err| SessionError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;
    let config =
        toml::from_str::<SessionConfig>(&content).map_err(|err| SessionError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}
