#![forbid(unsafe_code)]

//! Local topic publish/subscribe with RAII subscriptions and one-way links
//! between buses.
//!
//! Subscribers register under `"topic"` (auto-assigned name) or
//! `"topic.name"` (explicit name, unique per topic unless overridden). The
//! bus holds every callback weakly: dropping the [`Subscription`] retires
//! the subscriber, and dead entries are pruned lazily during publish.
//!
//! A publish to `"topic"` is local. A publish to `"topic!"` additionally
//! forwards one hop to every linked bus: a forwarded delivery is never
//! re-forwarded, so linked cycles cannot loop and a bus never receives its
//! own publish back through a link.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use serde_json::Value;

/// Suffix marking a publish for one-hop forwarding to linked buses.
pub const BROADCAST_SUFFIX: char = '!';

/// A subscriber callback.
pub type BusFn = Rc<dyn Fn(&Value)>;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A live subscriber already holds this `topic.name` slot.
    DuplicateSubscriber {
        /// The contested `topic.name` key.
        key: String,
    },
    /// The topic part of the key is empty.
    EmptyTopic,
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSubscriber { key } => {
                write!(f, "subscriber {key:?} already registered")
            }
            Self::EmptyTopic => write!(f, "empty topic"),
        }
    }
}

impl std::error::Error for BusError {}

// ─── Subscription ────────────────────────────────────────────────────────────

/// Keeps one subscriber alive. Dropping it retires the subscriber; the bus
/// prunes the dead entry on the next publish to that topic.
pub struct Subscription {
    topic: String,
    name: String,
    _callback: BusFn,
}

impl Subscription {
    /// The topic subscribed to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The subscriber name, explicit or auto-assigned (`_1`, `_2`, ...).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("name", &self.name)
            .finish()
    }
}

// ─── Bus ─────────────────────────────────────────────────────────────────────

struct BusSlot {
    name: String,
    callback: Weak<dyn Fn(&Value)>,
}

struct BusInner {
    topics: AHashMap<String, Vec<BusSlot>>,
    links: Vec<Weak<RefCell<BusInner>>>,
    next_auto: u64,
}

/// A topic bus. Cheaply cloneable; clones share the subscriber table.
pub struct Bus {
    inner: Rc<RefCell<BusInner>>,
}

impl Clone for Bus {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// An empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                topics: AHashMap::new(),
                links: Vec::new(),
                next_auto: 1,
            })),
        }
    }

    /// Register a subscriber under `"topic"` or `"topic.name"`. An omitted
    /// name is auto-assigned; an explicit name must be free among the
    /// topic's live subscribers.
    pub fn subscribe(
        &self,
        key: &str,
        f: impl Fn(&Value) + 'static,
    ) -> Result<Subscription, BusError> {
        self.register(key, f, false)
    }

    /// Like [`subscribe`](Self::subscribe), but an explicit name displaces
    /// any live subscriber already holding it.
    pub fn subscribe_override(
        &self,
        key: &str,
        f: impl Fn(&Value) + 'static,
    ) -> Result<Subscription, BusError> {
        self.register(key, f, true)
    }

    fn register(
        &self,
        key: &str,
        f: impl Fn(&Value) + 'static,
        replace: bool,
    ) -> Result<Subscription, BusError> {
        let (topic, explicit_name) = match key.split_once('.') {
            Some((topic, name)) => (topic, Some(name)),
            None => (key, None),
        };
        if topic.is_empty() {
            return Err(BusError::EmptyTopic);
        }
        let callback: BusFn = Rc::new(f);
        let mut inner = self.inner.borrow_mut();
        let name = match explicit_name {
            Some(name) => name.to_owned(),
            None => {
                let n = inner.next_auto;
                inner.next_auto += 1;
                format!("_{n}")
            }
        };
        let slots = inner.topics.entry(topic.to_owned()).or_default();
        if let Some(existing) = slots
            .iter()
            .position(|s| s.name == name && s.callback.strong_count() > 0)
        {
            if !replace {
                return Err(BusError::DuplicateSubscriber {
                    key: format!("{topic}.{name}"),
                });
            }
            slots.remove(existing);
        }
        slots.push(BusSlot {
            name: name.clone(),
            callback: Rc::downgrade(&callback),
        });
        Ok(Subscription {
            topic: topic.to_owned(),
            name,
            _callback: callback,
        })
    }

    /// Deliver `value` to the topic's live subscribers, in subscription
    /// order, pruning dead entries. A trailing `!` additionally forwards
    /// one hop to every linked bus. Returns the local delivery count.
    pub fn publish(&self, topic: &str, value: &Value) -> usize {
        let (topic, broadcast) = match topic.strip_suffix(BROADCAST_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (topic, false),
        };
        let delivered = self.deliver(topic, value);
        if broadcast {
            let links: Vec<Rc<RefCell<BusInner>>> = {
                let mut inner = self.inner.borrow_mut();
                inner.links.retain(|link| link.strong_count() > 0);
                inner.links.iter().filter_map(Weak::upgrade).collect()
            };
            for link in links {
                // One hop only: the linked bus delivers locally and never
                // forwards further.
                Bus { inner: link }.deliver(topic, value);
            }
        }
        delivered
    }

    fn deliver(&self, topic: &str, value: &Value) -> usize {
        let callbacks: Vec<BusFn> = {
            let mut inner = self.inner.borrow_mut();
            let Some(slots) = inner.topics.get_mut(topic) else {
                return 0;
            };
            slots.retain(|s| s.callback.strong_count() > 0);
            slots.iter().filter_map(|s| s.callback.upgrade()).collect()
        };
        for callback in &callbacks {
            callback(value);
        }
        callbacks.len()
    }

    /// Forward this bus's broadcast publishes to `other`, one way.
    /// Self-links are ignored.
    pub fn link(&self, other: &Bus) {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        self.inner
            .borrow_mut()
            .links
            .push(Rc::downgrade(&other.inner));
    }

    /// Live subscribers for `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.borrow().topics.get(topic).map_or(0, |slots| {
            slots
                .iter()
                .filter(|s| s.callback.strong_count() > 0)
                .count()
        })
    }

    /// Drop every subscriber slot and link.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.topics.clear();
        inner.links.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn counting(counter: &Rc<Cell<u32>>) -> impl Fn(&Value) + 'static {
        let seen = Rc::clone(counter);
        move |_| seen.set(seen.get() + 1)
    }

    #[test]
    fn publish_delivers_to_topic_subscribers_only() {
        let bus = Bus::new();
        let hits = Rc::new(Cell::new(0));
        let _sub = bus.subscribe("alpha", counting(&hits)).expect("subscribe");

        assert_eq!(bus.publish("alpha", &json!(1)), 1);
        assert_eq!(bus.publish("beta", &json!(2)), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn subscribers_receive_the_published_value() {
        let bus = Bus::new();
        let seen = Rc::new(RefCell::new(None));
        let out = Rc::clone(&seen);
        let _sub = bus
            .subscribe("state", move |v| *out.borrow_mut() = Some(v.clone()))
            .expect("subscribe");

        bus.publish("state", &json!({ "count": 3 }));
        assert_eq!(*seen.borrow(), Some(json!({ "count": 3 })));
    }

    #[test]
    fn dropping_the_subscription_retires_the_subscriber() {
        let bus = Bus::new();
        let hits = Rc::new(Cell::new(0));
        let sub = bus.subscribe("alpha", counting(&hits)).expect("subscribe");

        bus.publish("alpha", &json!(1));
        drop(sub);
        assert_eq!(bus.publish("alpha", &json!(2)), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count("alpha"), 0);
    }

    #[test]
    fn explicit_names_are_unique_per_topic() {
        let bus = Bus::new();
        let _a = bus.subscribe("alpha.logger", |_| {}).expect("first");
        let dup = bus.subscribe("alpha.logger", |_| {});
        assert_eq!(
            dup.err(),
            Some(BusError::DuplicateSubscriber {
                key: "alpha.logger".to_owned()
            })
        );
        // Same name on another topic is fine.
        let _b = bus.subscribe("beta.logger", |_| {}).expect("other topic");
    }

    #[test]
    fn dropped_subscriber_frees_its_name() {
        let bus = Bus::new();
        let sub = bus.subscribe("alpha.logger", |_| {}).expect("first");
        drop(sub);
        let _again = bus.subscribe("alpha.logger", |_| {}).expect("name freed");
    }

    #[test]
    fn override_displaces_the_previous_holder() {
        let bus = Bus::new();
        let first_hits = Rc::new(Cell::new(0));
        let second_hits = Rc::new(Cell::new(0));
        let _first = bus
            .subscribe("alpha.logger", counting(&first_hits))
            .expect("first");
        let _second = bus
            .subscribe_override("alpha.logger", counting(&second_hits))
            .expect("override");

        bus.publish("alpha", &json!(1));
        assert_eq!(first_hits.get(), 0);
        assert_eq!(second_hits.get(), 1);
        assert_eq!(bus.subscriber_count("alpha"), 1);
    }

    #[test]
    fn auto_names_are_distinct() {
        let bus = Bus::new();
        let a = bus.subscribe("alpha", |_| {}).expect("first");
        let b = bus.subscribe("alpha", |_| {}).expect("second");
        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with('_'));
        assert_eq!(bus.subscriber_count("alpha"), 2);
    }

    #[test]
    fn empty_topic_is_rejected() {
        let bus = Bus::new();
        assert_eq!(bus.subscribe("", |_| {}).err(), Some(BusError::EmptyTopic));
        assert_eq!(
            bus.subscribe(".name", |_| {}).err(),
            Some(BusError::EmptyTopic)
        );
    }

    #[test]
    fn broadcast_forwards_one_hop_only() {
        let a = Bus::new();
        let b = Bus::new();
        let c = Bus::new();
        a.link(&b);
        b.link(&c);

        let b_hits = Rc::new(Cell::new(0));
        let c_hits = Rc::new(Cell::new(0));
        let _sb = b.subscribe("alpha", counting(&b_hits)).expect("b");
        let _sc = c.subscribe("alpha", counting(&c_hits)).expect("c");

        a.publish("alpha!", &json!(1));
        assert_eq!(b_hits.get(), 1);
        assert_eq!(c_hits.get(), 0);
    }

    #[test]
    fn plain_publish_never_forwards() {
        let a = Bus::new();
        let b = Bus::new();
        a.link(&b);
        let b_hits = Rc::new(Cell::new(0));
        let _sb = b.subscribe("alpha", counting(&b_hits)).expect("b");

        a.publish("alpha", &json!(1));
        assert_eq!(b_hits.get(), 0);
    }

    #[test]
    fn linked_cycle_does_not_echo_back() {
        let a = Bus::new();
        let b = Bus::new();
        a.link(&b);
        b.link(&a);

        let a_hits = Rc::new(Cell::new(0));
        let b_hits = Rc::new(Cell::new(0));
        let _sa = a.subscribe("alpha", counting(&a_hits)).expect("a");
        let _sb = b.subscribe("alpha", counting(&b_hits)).expect("b");

        a.publish("alpha!", &json!(1));
        assert_eq!(a_hits.get(), 1);
        assert_eq!(b_hits.get(), 1);
    }

    #[test]
    fn dead_linked_bus_is_pruned() {
        let a = Bus::new();
        let hits = Rc::new(Cell::new(0));
        {
            let b = Bus::new();
            a.link(&b);
            let _sb = b.subscribe("alpha", counting(&hits)).expect("b");
            a.publish("alpha!", &json!(1));
            assert_eq!(hits.get(), 1);
        }
        // The linked bus is gone; broadcasting neither panics nor delivers.
        a.publish("alpha!", &json!(2));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn reset_clears_subscribers_and_links() {
        let a = Bus::new();
        let b = Bus::new();
        a.link(&b);
        let hits = Rc::new(Cell::new(0));
        let _sub = a.subscribe("alpha", counting(&hits)).expect("subscribe");

        a.reset();
        assert_eq!(a.publish("alpha!", &json!(1)), 0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn subscriber_may_unsubscribe_itself_mid_publish() {
        let bus = Bus::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        let me = Rc::clone(&slot);
        let sub = bus
            .subscribe("alpha", move |_| {
                seen.set(seen.get() + 1);
                me.borrow_mut().take();
            })
            .expect("subscribe");
        *slot.borrow_mut() = Some(sub);

        bus.publish("alpha", &json!(1));
        bus.publish("alpha", &json!(2));
        assert_eq!(hits.get(), 1);
    }
}
