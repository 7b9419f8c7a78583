//! Navigation layer seam.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::NavigationTarget;

pub trait Navigator {
    /// Location the user is currently on (path plus optional query).
    fn current_location(&self) -> String;
    fn navigate(&mut self, target: &NavigationTarget);
}

#[derive(Debug, Default)]
struct RecordingInner {
    location: String,
    requests: Vec<NavigationTarget>,
}

/// Navigator that records requests instead of performing them. Used by tests
/// and by hosts (like the CLI) that only report where the user should go.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    inner: Rc<RefCell<RecordingInner>>,
}

impl RecordingNavigator {
    pub fn at(location: &str) -> Self {
        let navigator = Self::default();
        navigator.set_location(location);
        navigator
    }

    pub fn set_location(&self, location: &str) {
        self.inner.borrow_mut().location = location.to_string();
    }

    pub fn requests(&self) -> Vec<NavigationTarget> {
        self.inner.borrow().requests.clone()
    }

    pub fn last_request(&self) -> Option<NavigationTarget> {
        self.inner.borrow().requests.last().cloned()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().requests.clear();
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.inner.borrow().location.clone()
    }

    fn navigate(&mut self, target: &NavigationTarget) {
        self.inner.borrow_mut().requests.push(target.clone());
    }
}
