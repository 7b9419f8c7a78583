//! Tracing setup: stderr plus a daily-rolling file under the session home.
//!
//! `ATTENDANCE_SESSION_DEBUG_LOG=1` forces `debug`; otherwise `RUST_LOG`
//! applies, defaulting to `info`. Stdout stays reserved for JSON reports.

use std::env;
use std::io;

use session_core::SessionPaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_ENV: &str = "ATTENDANCE_SESSION_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "session-shell.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// whole process or buffered file output is lost.
pub fn init() -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    let Some(logs_dir) = SessionPaths::resolve().ok().map(|paths| paths.logs_dir()) else {
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(stderr_layer)
            .try_init();
        return None;
    };

    if let Err(err) = fs_err::create_dir_all(&logs_dir) {
        eprintln!("session-shell: file logging disabled: {}", err);
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(stderr_layer)
            .try_init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Some(guard)
}

fn filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}
