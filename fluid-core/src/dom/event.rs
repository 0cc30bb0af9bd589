//! Event listeners and dispatch.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::node::Node;

/// Identifies one registered listener, for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// An event delivered to listeners of its target node.
pub struct Event {
    event_type: String,
    target: Node,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: Node) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched on.
    pub fn target(&self) -> &Node {
        &self.target
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("target", &self.target)
            .finish()
    }
}

pub(crate) type Handler = Rc<dyn Fn(&Event)>;

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event_type: String,
    pub(crate) handler: Handler,
}
