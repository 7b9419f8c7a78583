//! Single-threaded runtime wiring a manager to its timer queue and activity bus.
//!
//! The host event loop owns a `SessionRuntime` and drives it with three calls:
//! [`SessionRuntime::next_deadline`] to know how long it may sleep,
//! [`SessionRuntime::run_due_timers`] when it wakes, and
//! [`SessionRuntime::dispatch_activity`] for each user interaction.

use tracing::trace;

use crate::activity::ActivityBus;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::cookies::CookieJar;
use crate::headers::AuthHeaders;
use crate::manager::{Collaborators, SessionManager};
use crate::navigation::Navigator;
use crate::storage::SessionStorage;
use crate::timer::TimerQueue;
use crate::types::{ActivityKind, EpochMillis};

pub struct SessionRuntime {
    manager: SessionManager,
    timers: TimerQueue,
    activity: ActivityBus,
}

impl SessionRuntime {
    pub fn new(
        config: SessionConfig,
        storage: Box<dyn SessionStorage>,
        cookies: Box<dyn CookieJar>,
        headers: Box<dyn AuthHeaders>,
        navigator: Box<dyn Navigator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let timers = TimerQueue::new();
        let activity = ActivityBus::new();
        let manager = SessionManager::new(
            config,
            Collaborators {
                storage,
                cookies,
                headers,
                navigator,
                clock,
                activity: Box::new(activity.clone()),
                scheduler: Box::new(timers.clone()),
            },
        );
        Self {
            manager,
            timers,
            activity,
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SessionManager {
        &mut self.manager
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn activity(&self) -> &ActivityBus {
        &self.activity
    }

    /// Routes a user interaction to the manager if anything listens for it.
    /// Returns whether it was delivered.
    pub fn dispatch_activity(&mut self, kind: ActivityKind) -> bool {
        if !self.activity.is_listening(kind) {
            trace!(kind = %kind, "No listener for activity");
            return false;
        }
        self.manager.handle_activity(kind);
        true
    }

    /// Fires every timer due at the manager's current time. Returns how many fired.
    pub fn run_due_timers(&mut self) -> usize {
        let due = self.timers.take_due(self.manager.now());
        for id in &due {
            self.manager.on_timer(*id);
        }
        due.len()
    }

    pub fn next_deadline(&self) -> Option<EpochMillis> {
        self.timers.next_deadline()
    }
}
