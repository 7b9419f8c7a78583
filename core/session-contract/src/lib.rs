//! Session contract shared by the session manager and its collaborators.
//!
//! The manager is the only writer of the persisted record, the cookies and the
//! default `Authorization` header. Collaborators (the routing gate, the login
//! screen, REST callers) only read them, and this crate pins the names and
//! shapes they agree on so neither side drifts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted key holding the serialized [`UserIdentity`].
pub const USER_STORAGE_KEY: &str = "user";
/// Persisted key holding the last-activity instant (epoch milliseconds, decimal string).
pub const LAST_ACTIVITY_STORAGE_KEY: &str = "lastActivity";

/// Presence flag cookie read by the routing gate.
pub const USER_COOKIE: &str = "user";
pub const USER_COOKIE_VALUE: &str = "true";
/// Role cookie read by the routing gate for admin-only paths.
pub const USER_ROLE_COOKIE: &str = "userRole";
pub const COOKIE_PATH: &str = "/";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const ADMIN_ROLE: &str = "admin";

/// Query flag the login screen reads to show the session-expired banner.
pub const EXPIRED_QUERY_PARAM: &str = "expired";

const MAX_TOKEN_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub code: String,
    pub message: String,
}

impl ContractError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ContractError {}

/// Account role. Only `"admin"` is meaningful to the dashboard; every other
/// string is carried through untouched so the routing gate sees what the
/// backend sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => ADMIN_ROLE,
            Role::Other(value) => value,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == ADMIN_ROLE {
            Role::Admin
        } else {
            Role::Other(value)
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => ADMIN_ROLE.to_string(),
            Role::Other(value) => value,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend identifiers arrive either as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    fn is_blank(&self) -> bool {
        match self {
            RecordId::Number(_) => false,
            RecordId::Text(value) => value.trim().is_empty(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(value) => write!(f, "{}", value),
            RecordId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

/// Identity handed over by the authentication collaborator after a
/// successful credential check, and persisted under [`USER_STORAGE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(alias = "company_id")]
    pub company_id: RecordId,
    #[serde(alias = "company_name")]
    pub company_name: String,
    pub token: String,
}

impl UserIdentity {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.id.is_blank() {
            return Err(ContractError::new("missing_field", "id is required"));
        }
        if self.role.as_str().trim().is_empty() {
            return Err(ContractError::new("missing_field", "role is required"));
        }
        if self.token.trim().is_empty() {
            return Err(ContractError::new("missing_field", "token is required"));
        }
        if self.token.len() > MAX_TOKEN_BYTES {
            return Err(ContractError::new(
                "invalid_token",
                format!("token must be {} bytes or fewer", MAX_TOKEN_BYTES),
            ));
        }
        if self.token.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(ContractError::new(
                "invalid_token",
                "token must not contain whitespace or control characters",
            ));
        }
        Ok(())
    }
}

/// Parses and validates a persisted user record.
pub fn parse_user_record(raw: &str) -> Result<UserIdentity, ContractError> {
    let identity: UserIdentity = serde_json::from_str(raw).map_err(|err| {
        ContractError::new("invalid_record", format!("user record is invalid JSON: {}", err))
    })?;
    identity.validate()?;
    Ok(identity)
}

pub fn serialize_user_record(identity: &UserIdentity) -> Result<String, ContractError> {
    serde_json::to_string(identity).map_err(|err| {
        ContractError::new(
            "invalid_record",
            format!("user record could not be serialized: {}", err),
        )
    })
}

/// Parses the persisted last-activity value (epoch milliseconds).
pub fn parse_last_activity(raw: &str) -> Result<i64, ContractError> {
    let value: i64 = raw.trim().parse().map_err(|_| {
        ContractError::new(
            "invalid_timestamp",
            "lastActivity must be integer epoch milliseconds",
        )
    })?;
    if value < 0 {
        return Err(ContractError::new(
            "invalid_timestamp",
            "lastActivity must not be negative",
        ));
    }
    Ok(value)
}

pub fn format_last_activity(epoch_millis: i64) -> String {
    epoch_millis.to_string()
}

/// Value installed as the HTTP client's default `Authorization` header.
pub fn bearer_value(token: &str) -> String {
    format!("Bearer {}", token)
}

/// A cookie write. Clearing is a write with `max_age_secs == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: i64,
}

impl CookieDirective {
    pub fn set(name: &str, value: impl Into<String>, max_age_secs: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            path: COOKIE_PATH.to_string(),
            max_age_secs: max_age_secs.max(0),
        }
    }

    pub fn clear(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            path: COOKIE_PATH.to_string(),
            max_age_secs: 0,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.max_age_secs <= 0
    }

    /// Renders the directive as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        format!(
            "{}={}; Path={}; Max-Age={}",
            self.name, self.value, self.path, self.max_age_secs
        )
    }
}

/// The two cookies announcing an authenticated session to the routing gate.
pub fn session_cookies(role: &Role, max_age_secs: i64) -> [CookieDirective; 2] {
    [
        CookieDirective::set(USER_COOKIE, USER_COOKIE_VALUE, max_age_secs),
        CookieDirective::set(USER_ROLE_COOKIE, role.as_str(), max_age_secs),
    ]
}

pub fn clear_session_cookies() -> [CookieDirective; 2] {
    [
        CookieDirective::clear(USER_COOKIE),
        CookieDirective::clear(USER_ROLE_COOKIE),
    ]
}

/// Strips query string and fragment so `/login?expired=true` matches `/login`.
pub fn route_path(location: &str) -> &str {
    let end = location.find(|c| c == '?' || c == '#').unwrap_or(location.len());
    &location[..end]
}

/// Builds the login location, appending the expiry flag when requested.
pub fn login_location(login_route: &str, expired: bool) -> String {
    if !expired {
        return login_route.to_string();
    }
    let separator = if login_route.contains('?') { '&' } else { '?' };
    format!("{}{}{}=true", login_route, separator, EXPIRED_QUERY_PARAM)
}
