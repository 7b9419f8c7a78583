//! Wall clock abstraction.

use std::cell::Cell;
use std::rc::Rc;

use chrono::Utc;

use crate::types::EpochMillis;

pub trait Clock {
    fn now_millis(&self) -> EpochMillis;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock. Clones share the same instant, so a test can keep one
/// handle while the manager owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<EpochMillis>>,
}

impl ManualClock {
    pub fn new(start: EpochMillis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: EpochMillis) {
        self.now.set(now);
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get().saturating_add(millis));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> EpochMillis {
        self.now.get()
    }
}
