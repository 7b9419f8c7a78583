//! Cookie side channel read by the routing gate.
//!
//! The manager only ever writes the two cookies described in
//! [`session_contract::session_cookies`]; clearing is a write with
//! `Max-Age=0`. Jars store an absolute expiry so a reader can tell a live
//! cookie from a stale one without knowing when it was issued.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use session_contract::CookieDirective;

use crate::error::{Result, SessionError};
use crate::storage::write_atomic;
use crate::types::EpochMillis;

pub trait CookieJar {
    /// Applies a cookie write issued at `now`.
    fn apply(&mut self, directive: &CookieDirective, now: EpochMillis) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    pub path: String,
    pub expires_at: EpochMillis,
}

impl StoredCookie {
    fn from_directive(directive: &CookieDirective, now: EpochMillis) -> Self {
        Self {
            value: directive.value.clone(),
            path: directive.path.clone(),
            expires_at: now.saturating_add(directive.max_age_secs.saturating_mul(1000)),
        }
    }

    pub fn is_live(&self, now: EpochMillis) -> bool {
        now < self.expires_at
    }
}

fn apply_to(
    cookies: &mut BTreeMap<String, StoredCookie>,
    directive: &CookieDirective,
    now: EpochMillis,
) {
    if directive.is_removal() {
        cookies.remove(&directive.name);
    } else {
        cookies.insert(
            directive.name.clone(),
            StoredCookie::from_directive(directive, now),
        );
    }
}

#[derive(Debug, Default)]
struct MemoryJarInner {
    cookies: BTreeMap<String, StoredCookie>,
    history: VecDeque<CookieDirective>,
}

/// Directives kept by [`MemoryCookieJar::history`]; older ones are dropped.
pub const MEMORY_JAR_HISTORY_LIMIT: usize = 64;

/// In-memory jar. Clones share state; `history` keeps the most recent
/// directives so tests can assert re-issues and clears.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    inner: Rc<RefCell<MemoryJarInner>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_value(&self, name: &str, now: EpochMillis) -> Option<String> {
        self.inner
            .borrow()
            .cookies
            .get(name)
            .filter(|cookie| cookie.is_live(now))
            .map(|cookie| cookie.value.clone())
    }

    pub fn get(&self, name: &str) -> Option<StoredCookie> {
        self.inner.borrow().cookies.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().cookies.is_empty()
    }

    pub fn history(&self) -> Vec<CookieDirective> {
        self.inner.borrow().history.iter().cloned().collect()
    }
}

impl CookieJar for MemoryCookieJar {
    fn apply(&mut self, directive: &CookieDirective, now: EpochMillis) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.history.len() == MEMORY_JAR_HISTORY_LIMIT {
            inner.history.pop_front();
        }
        inner.history.push_back(directive.clone());
        apply_to(&mut inner.cookies, directive, now);
        Ok(())
    }
}

/// JSON-file jar for hosts whose routing gate runs in another process.
#[derive(Debug, Clone)]
pub struct FileCookieJar {
    file_path: PathBuf,
}

impl FileCookieJar {
    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
        }
    }

    /// Reads the cookies that are still live at `now`.
    pub fn live_cookies(&self, now: EpochMillis) -> Result<BTreeMap<String, StoredCookie>> {
        let mut cookies = self.load()?;
        cookies.retain(|_, cookie| cookie.is_live(now));
        Ok(cookies)
    }

    fn load(&self) -> Result<BTreeMap<String, StoredCookie>> {
        let content = match fs_err::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(SessionError::Io {
                    context: "read cookie jar".to_string(),
                    source: err,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(cookies) => Ok(cookies),
            Err(err) => {
                warn!(
                    path = %self.file_path.display(),
                    error = %err,
                    "Cookie jar file is corrupt; treating as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }
}

impl CookieJar for FileCookieJar {
    fn apply(&mut self, directive: &CookieDirective, now: EpochMillis) -> Result<()> {
        let mut cookies = self.load()?;
        apply_to(&mut cookies, directive, now);
        let content = serde_json::to_string_pretty(&cookies).map_err(|err| SessionError::Json {
            context: "serialize cookie jar".to_string(),
            source: err,
        })?;
        write_atomic(&self.file_path, &content, "cookie jar")
    }
}
