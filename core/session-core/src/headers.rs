//! Default header map of the HTTP client used by REST collaborators.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub trait AuthHeaders {
    fn set_default(&mut self, name: &str, value: &str);
    fn remove_default(&mut self, name: &str);
}

/// Shared header map. REST callers hold a clone and read it when building
/// requests; only the session manager writes it.
#[derive(Debug, Clone, Default)]
pub struct SharedHeaders {
    headers: Rc<RefCell<BTreeMap<String, String>>>,
}

impl SharedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header names are matched case-insensitively, as HTTP requires.
    pub fn get(&self, name: &str) -> Option<String> {
        self.headers.borrow().get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.headers.borrow().clone()
    }
}

impl AuthHeaders for SharedHeaders {
    fn set_default(&mut self, name: &str, value: &str) {
        self.headers
            .borrow_mut()
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    fn remove_default(&mut self, name: &str) {
        self.headers.borrow_mut().remove(&name.to_ascii_lowercase());
    }
}
