//! Shared value types for the session manager and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use session_contract::{login_location, UserIdentity};

/// Wall-clock instant in epoch milliseconds.
pub type EpochMillis = i64;

/// Recognized user interaction that resets the inactivity clock.
///
/// Deliberately independent of any concrete UI toolkit: a browser host maps
/// DOM events onto these, a desktop or terminal host maps its own input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PointerDown,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::PointerDown,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PointerDown => "pointer_down",
            ActivityKind::KeyPress => "key_press",
            ActivityKind::Scroll => "scroll",
            ActivityKind::TouchStart => "touch_start",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pointer_down" | "pointerdown" | "mousedown" => Ok(ActivityKind::PointerDown),
            "key_press" | "keypress" | "keydown" => Ok(ActivityKind::KeyPress),
            "scroll" => Ok(ActivityKind::Scroll),
            "touch_start" | "touchstart" => Ok(ActivityKind::TouchStart),
            other => Err(format!("Unknown activity kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    Normal,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Where the manager asks the navigation layer to go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationTarget {
    /// Default authenticated landing page.
    Landing,
    /// Login screen; `expired` adds the session-expired query flag.
    Login { expired: bool },
}

impl NavigationTarget {
    /// Resolves the target against the configured routes.
    pub fn location(&self, landing_route: &str, login_route: &str) -> String {
        match self {
            NavigationTarget::Landing => landing_route.to_string(),
            NavigationTarget::Login { expired } => login_location(login_route, *expired),
        }
    }
}

/// Handle for a repeating timer registered with a [`crate::Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Handle for an activity subscription registered with a [`crate::ActivitySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Read-only snapshot of the session, safe to hand to page components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub user: Option<UserIdentity>,
    pub is_admin: bool,
    pub last_activity: Option<EpochMillis>,
    pub expires_at: Option<EpochMillis>,
    pub remaining_ms: Option<i64>,
}
