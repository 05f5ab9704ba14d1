#![forbid(unsafe_code)]

//! In-memory mock element for driving the engine in unit tests.
//!
//! Selectors match child names literally; dispatch support and attachment
//! are toggleable so capability and orphan edge cases can be exercised.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::element::{BoundListener, Element, ElementKey, ListenerId};
use crate::event::Event;

pub(crate) struct MockElement {
    inner: Rc<RefCell<MockInner>>,
}

struct MockInner {
    name: String,
    attached: bool,
    supports_notify: bool,
    children: Vec<MockElement>,
    listeners: AHashMap<String, Vec<(ListenerId, BoundListener)>>,
    next_listener: ListenerId,
    dispatched: Vec<String>,
}

impl Clone for MockElement {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl MockElement {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MockInner {
                name: name.into(),
                attached: true,
                supports_notify: true,
                children: Vec::new(),
                listeners: AHashMap::new(),
                next_listener: 1,
                dispatched: Vec::new(),
            })),
        }
    }

    pub(crate) fn with_child(self, child: MockElement) -> Self {
        self.inner.borrow_mut().children.push(child);
        self
    }

    pub(crate) fn set_attached(&self, attached: bool) {
        self.inner.borrow_mut().attached = attached;
    }

    pub(crate) fn set_supports_notify(&self, supports: bool) {
        self.inner.borrow_mut().supports_notify = supports;
    }

    pub(crate) fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Event types this element's dispatch method has received, in order.
    pub(crate) fn dispatched(&self) -> Vec<String> {
        self.inner.borrow().dispatched.clone()
    }

    fn collect_matches(&self, name: &str, out: &mut Vec<MockElement>) {
        for child in self.inner.borrow().children.iter() {
            if child.inner.borrow().name == name {
                out.push(child.clone());
            }
            child.collect_matches(name, out);
        }
    }
}

impl Element for MockElement {
    fn key(&self) -> ElementKey {
        Rc::as_ptr(&self.inner) as ElementKey
    }

    fn query(&self, selector: &str) -> Vec<Self> {
        let mut out = Vec::new();
        self.collect_matches(selector, &mut out);
        out
    }

    fn listen(&self, event_type: &str, listener: BoundListener) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner
            .listeners
            .entry(event_type.to_owned())
            .or_default()
            .push((id, listener));
        id
    }

    fn unlisten(&self, event_type: &str, listener: ListenerId) {
        if let Some(list) = self.inner.borrow_mut().listeners.get_mut(event_type) {
            list.retain(|(id, _)| *id != listener);
        }
    }

    fn notify(&self, event: &Event) -> bool {
        let snapshot: Vec<BoundListener> = {
            let mut inner = self.inner.borrow_mut();
            if !inner.supports_notify {
                return false;
            }
            inner.dispatched.push(event.event_type().to_owned());
            inner
                .listeners
                .get(event.event_type())
                .map(|list| list.iter().map(|(_, f)| Rc::clone(f)).collect())
                .unwrap_or_default()
        };
        for listener in snapshot {
            listener(event);
        }
        true
    }

    fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }
}
