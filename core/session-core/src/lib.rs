//! # session-core
//!
//! Session manager for the attendance dashboard: login state, persistence
//! across reloads, and forced logout after a window of inactivity.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The host owns the event loop.
//! - **Not thread-safe**: One manager per tab / UI scope, driven from one thread.
//! - **Graceful degradation**: Corrupt or missing persisted state means "logged
//!   out", never an error.
//! - **Single writer**: The manager is the only component that writes the
//!   session, the persisted record, the cookies and the default auth header.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use session_core::{SessionRuntime, SessionConfig, MemoryStorage, MemoryCookieJar,
//!     SharedHeaders, RecordingNavigator, SystemClock};
//!
//! let mut runtime = SessionRuntime::new(
//!     SessionConfig::default(),
//!     Box::new(MemoryStorage::new()),
//!     Box::new(MemoryCookieJar::new()),
//!     Box::new(SharedHeaders::new()),
//!     Box::new(RecordingNavigator::at("/dashboard")),
//!     Box::new(SystemClock),
//! );
//! runtime.manager_mut().initialize();
//! ```

pub mod activity;
pub mod clock;
pub mod config;
pub mod cookies;
pub mod error;
pub mod headers;
pub mod manager;
pub mod navigation;
pub mod paths;
pub mod runtime;
pub mod storage;
pub mod timer;
pub mod types;

pub use activity::{ActivityBus, ActivitySource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, SessionConfig};
pub use cookies::{
    CookieJar, FileCookieJar, MemoryCookieJar, StoredCookie, MEMORY_JAR_HISTORY_LIMIT,
};
pub use error::{Result, SessionError};
pub use headers::{AuthHeaders, SharedHeaders};
pub use manager::{Collaborators, SessionManager};
pub use navigation::{Navigator, RecordingNavigator};
pub use paths::SessionPaths;
pub use runtime::SessionRuntime;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use timer::{Scheduler, TimerQueue};
pub use types::*;

pub use session_contract::{RecordId, Role, UserIdentity};
