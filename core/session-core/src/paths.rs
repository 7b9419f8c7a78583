//! Path management for file-backed session data.
//!
//! Production hosts use `SessionPaths::resolve()`, which points to
//! `~/.attendance-session/` unless `ATTENDANCE_SESSION_HOME` overrides it.
//! Tests use `SessionPaths::with_root(temp_dir)` for isolation.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, SessionError};

pub const HOME_ENV: &str = "ATTENDANCE_SESSION_HOME";
const DEFAULT_DIR_NAME: &str = ".attendance-session";

#[derive(Debug, Clone)]
pub struct SessionPaths {
    root: PathBuf,
}

impl SessionPaths {
    pub fn resolve() -> Result<Self> {
        if let Ok(root) = env::var(HOME_ENV) {
            if !root.trim().is_empty() {
                return Ok(Self::with_root(PathBuf::from(root)));
            }
        }
        let home = dirs::home_dir().ok_or(SessionError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(DEFAULT_DIR_NAME)))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.toml (session timing and routes).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to local-storage.json (persisted session record).
    pub fn local_storage_file(&self) -> PathBuf {
        self.root.join("local-storage.json")
    }

    /// Path to cookies.json (cookie contract read by the routing gate).
    pub fn cookies_file(&self) -> PathBuf {
        self.root.join("cookies.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
