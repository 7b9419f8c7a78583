//! Long-running tab: the loop thread owns the runtime, a reader thread
//! forwards stdin lines over a channel.
//!
//! Input lines name activity kinds (`pointer_down`, `key_press`, `scroll`,
//! `touch_start`, or their DOM names). `status` prints a report and `logout`
//! ends the session. The loop exits once the session is gone or stdin closes;
//! on stdin close the session stays persisted for the next invocation.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use session_core::{ActivityKind, EpochMillis, LogoutReason};

use crate::error::ShellError;
use crate::host::Host;

enum Input {
    Line(String),
    Closed,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Activity(ActivityKind),
    Status,
    Logout,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    match line {
        "status" => Ok(Some(Command::Status)),
        "logout" => Ok(Some(Command::Logout)),
        other => other.parse::<ActivityKind>().map(|kind| Some(Command::Activity(kind))),
    }
}

pub fn run(host: &mut Host) -> Result<(), ShellError> {
    host.print_report()?;
    if !host.is_authenticated() {
        info!("No active session; nothing to watch");
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Input::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to read stdin");
                        break;
                    }
                }
            }
            let _ = tx.send(Input::Closed);
        })
        .map_err(|err| ShellError::Io {
            context: "spawn stdin reader".to_string(),
            source: err,
        })?;

    event_loop(host, &rx)
}

fn event_loop(host: &mut Host, rx: &Receiver<Input>) -> Result<(), ShellError> {
    while host.is_authenticated() {
        match rx.recv_timeout(time_until_next_timer(host)) {
            Ok(Input::Line(line)) => match parse_command(&line) {
                Ok(Some(Command::Activity(kind))) => {
                    if !host.runtime_mut().dispatch_activity(kind) {
                        debug!(kind = %kind, "Activity ignored");
                    }
                }
                Ok(Some(Command::Status)) => host.print_report()?,
                Ok(Some(Command::Logout)) => {
                    host.runtime_mut().manager_mut().logout(LogoutReason::Normal);
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Ignoring input line"),
            },
            Ok(Input::Closed) | Err(RecvTimeoutError::Disconnected) => {
                info!("Input closed; leaving session persisted");
                host.runtime_mut().manager_mut().shutdown();
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let fired = host.runtime_mut().run_due_timers();
        if fired > 0 {
            debug!(fired, "Timers fired");
        }
    }

    host.print_report()
}

fn time_until_next_timer(host: &Host) -> Duration {
    let runtime = host.runtime();
    wait_for(
        runtime.next_deadline(),
        runtime.manager().now(),
        runtime.manager().config().poll_interval(),
    )
}

/// Sleep until `deadline`, immediately when it has passed, or one poll
/// period when nothing is scheduled.
fn wait_for(deadline: Option<EpochMillis>, now: EpochMillis, idle: Duration) -> Duration {
    match deadline {
        Some(deadline) => {
            Duration::from_millis(u64::try_from(deadline.saturating_sub(now)).unwrap_or(0))
        }
        None => idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_never_underflows_for_past_deadlines() {
        let idle = Duration::from_secs(30);
        assert_eq!(wait_for(Some(1_000), 5_000, idle), Duration::ZERO);
        assert_eq!(wait_for(Some(i64::MIN), i64::MAX, idle), Duration::ZERO);
        assert_eq!(wait_for(Some(31_000), 1_000, idle), Duration::from_secs(30));
        assert_eq!(wait_for(None, 1_000, idle), idle);
    }

    #[test]
    fn parses_activity_and_control_lines() {
        assert_eq!(
            parse_command("keydown").unwrap(),
            Some(Command::Activity(ActivityKind::KeyPress))
        );
        assert_eq!(
            parse_command(" touch_start ").unwrap(),
            Some(Command::Activity(ActivityKind::TouchStart))
        );
        assert_eq!(parse_command("status").unwrap(), Some(Command::Status));
        assert_eq!(parse_command("logout").unwrap(), Some(Command::Logout));
        assert_eq!(parse_command("   ").unwrap(), None);
        assert!(parse_command("wiggle").is_err());
    }
}
