//! Activity notification source.
//!
//! The manager subscribes when a session becomes authenticated and
//! unsubscribes when it ends, so a host that installs real listeners (DOM
//! events, terminal input) can mirror the subscription set exactly and never
//! leak listeners across login/logout cycles.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::types::{ActivityKind, ListenerId};

pub trait ActivitySource {
    fn subscribe(&mut self, kinds: &[ActivityKind]) -> ListenerId;
    fn unsubscribe(&mut self, id: ListenerId);
}

#[derive(Debug, Default)]
struct BusInner {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Vec<ActivityKind>>,
}

/// In-process activity source. Clones share the subscription table.
#[derive(Debug, Clone, Default)]
pub struct ActivityBus {
    inner: Rc<RefCell<BusInner>>,
}

impl ActivityBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_listening(&self, kind: ActivityKind) -> bool {
        self.inner
            .borrow()
            .listeners
            .values()
            .any(|kinds| kinds.contains(&kind))
    }

    pub fn listeners_for(&self, kind: ActivityKind) -> Vec<ListenerId> {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|(_, kinds)| kinds.contains(&kind))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl ActivitySource for ActivityBus {
    fn subscribe(&mut self, kinds: &[ActivityKind]) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner.listeners.insert(id, kinds.to_vec());
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        self.inner.borrow_mut().listeners.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_unsubscribe() {
        let mut bus = ActivityBus::new();
        let id = bus.subscribe(&[ActivityKind::KeyPress, ActivityKind::Scroll]);
        assert!(bus.is_listening(ActivityKind::KeyPress));
        assert!(!bus.is_listening(ActivityKind::TouchStart));
        assert_eq!(bus.listeners_for(ActivityKind::Scroll), vec![id]);

        bus.unsubscribe(id);
        assert_eq!(bus.listener_count(), 0);
        assert!(!bus.is_listening(ActivityKind::KeyPress));
    }

    #[test]
    fn listener_ids_are_unique() {
        let mut bus = ActivityBus::new();
        let first = bus.subscribe(&ActivityKind::ALL);
        bus.unsubscribe(first);
        let second = bus.subscribe(&ActivityKind::ALL);
        assert_ne!(first, second);
    }
}
