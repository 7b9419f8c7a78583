//! Cancellable repeating timers for a single-threaded event loop.
//!
//! `TimerQueue` never calls back into the manager itself. The host loop asks
//! for the next deadline, sleeps, then drains the due timer ids and routes
//! each to [`crate::SessionManager::on_timer`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::types::{EpochMillis, TimerId};

pub trait Scheduler {
    fn schedule_repeating(&mut self, period: Duration, now: EpochMillis) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

#[derive(Debug, Clone, Copy)]
struct RepeatingTimer {
    period_ms: i64,
    next_due: EpochMillis,
}

#[derive(Debug, Default)]
struct QueueInner {
    next_id: u64,
    timers: BTreeMap<TimerId, RepeatingTimer>,
}

/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_deadline(&self) -> Option<EpochMillis> {
        self.inner
            .borrow()
            .timers
            .values()
            .map(|timer| timer.next_due)
            .min()
    }

    /// Returns every timer due at `now` and re-arms it. A timer that missed
    /// several periods (host asleep) fires once, not once per missed period.
    pub fn take_due(&self, now: EpochMillis) -> Vec<TimerId> {
        let mut inner = self.inner.borrow_mut();
        let mut due = Vec::new();
        for (id, timer) in inner.timers.iter_mut() {
            if timer.next_due > now {
                continue;
            }
            due.push(*id);
            let missed = (now - timer.next_due) / timer.period_ms;
            timer.next_due += (missed + 1) * timer.period_ms;
        }
        due
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.inner.borrow().timers.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.borrow().timers.len()
    }
}

impl Scheduler for TimerQueue {
    fn schedule_repeating(&mut self, period: Duration, now: EpochMillis) -> TimerId {
        let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX).max(1);
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = TimerId(inner.next_id);
        inner.timers.insert(
            id,
            RepeatingTimer {
                period_ms,
                next_due: now.saturating_add(period_ms),
            },
        );
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.inner.borrow_mut().timers.remove(&id);
    }
}
