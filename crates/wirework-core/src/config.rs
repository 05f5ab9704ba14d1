#![forbid(unsafe_code)]

//! Handler-set and event-config model.
//!
//! A raw handler set mixes event-type slots with underscore-prefixed
//! metadata slots; [`normalize`] strips the metadata out before anything is
//! attached. A config value for a selector is either a fixed handler set
//! applied to every matched element, or a factory invoked once per matched
//! element (closing over the match index, for example).

use std::rc::Rc;

use crate::element::Element;
use crate::event::Event;
use crate::scope::{Scope, ScopeFn};

/// The selector meaning "the root element itself, without querying".
pub const ROOT_SELECTOR: &str = ".";

/// A raw slot in a handler set.
#[derive(Clone)]
pub(crate) enum Slot<E: Element> {
    /// An event listener keyed by event type.
    Listener(ScopeFn<E>),
    /// A metadata value; meaningful only under an underscore-prefixed key.
    Meta(String),
}

/// Ordered set of raw `(key, slot)` entries declared for one selector.
///
/// Listener keys name event types (`"click"`). Keys starting with `_` are
/// metadata and never reach the element; the single consumed metadata key
/// is `_id`, which names the wired node explicitly.
#[derive(Clone)]
pub struct HandlerSet<E: Element> {
    slots: Vec<(String, Slot<E>)>,
}

impl<E: Element> Default for HandlerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> HandlerSet<E> {
    /// An empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Declare a listener for `event_type`. Repeated declarations for the
    /// same type all attach; there is no de-duplication.
    #[must_use]
    pub fn on(
        mut self,
        event_type: impl Into<String>,
        listener: impl Fn(&Scope<E>, &Event) + 'static,
    ) -> Self {
        self.slots
            .push((event_type.into(), Slot::Listener(Rc::new(listener))));
        self
    }

    /// Attach a raw metadata slot. Keys are stored as given; only keys
    /// starting with `_` are treated as metadata during normalization.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.push((key.into(), Slot::Meta(value.into())));
        self
    }

    /// Name the wired node explicitly. Sugar for `meta("_id", id)`.
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.meta("_id", id)
    }

    /// Number of raw slots, metadata included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the set declares nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slots(&self) -> &[(String, Slot<E>)] {
        &self.slots
    }
}

/// Metadata collected while normalizing a handler set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Meta {
    /// Explicit node identifier, from `_id`.
    pub(crate) id: Option<String>,
    /// Stripped-but-unconsumed metadata, kept for diagnostics.
    pub(crate) extra: Vec<(String, String)>,
}

/// Split a handler set into attachable listener pairs and metadata.
///
/// Underscore-prefixed keys never reach the element. A listener declared
/// under a metadata key, or a metadata value under an event-type key, is
/// neither attachable nor meaningful and is dropped.
pub(crate) fn normalize<E: Element>(set: &HandlerSet<E>) -> (Vec<(String, ScopeFn<E>)>, Meta) {
    let mut listeners = Vec::new();
    let mut meta = Meta::default();
    for (key, slot) in set.slots() {
        if let Some(name) = key.strip_prefix('_') {
            match slot {
                Slot::Meta(value) if name == "id" => meta.id = Some(value.clone()),
                Slot::Meta(value) => meta.extra.push((name.to_owned(), value.clone())),
                Slot::Listener(_) => {}
            }
            continue;
        }
        if let Slot::Listener(listener) = slot {
            listeners.push((key.clone(), Rc::clone(listener)));
        }
    }
    (listeners, meta)
}

/// Factory invoked once per matched element with
/// `(scope, element, index, all_matches)`.
pub type PerElementFn<E> = Rc<dyn Fn(&Scope<E>, &E, usize, &[E]) -> HandlerSet<E>>;

/// Event config for one selector.
#[derive(Clone)]
pub enum EventConfig<E: Element> {
    /// One handler set applied to every matched element.
    Fixed(HandlerSet<E>),
    /// A factory producing a per-element handler set.
    PerElement(PerElementFn<E>),
}

/// Ordered `(selector, config)` map handed to
/// [`Circuit::new`](crate::circuit::Circuit::new).
#[derive(Clone)]
pub struct EventConfigs<E: Element> {
    entries: Vec<(String, EventConfig<E>)>,
}

impl<E: Element> Default for EventConfigs<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> EventConfigs<E> {
    /// An empty config map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Apply one handler set to every element matching `selector`.
    #[must_use]
    pub fn fixed(mut self, selector: impl Into<String>, set: HandlerSet<E>) -> Self {
        self.entries
            .push((selector.into(), EventConfig::Fixed(set)));
        self
    }

    /// Invoke a factory once per element matching `selector`.
    #[must_use]
    pub fn per_element(
        mut self,
        selector: impl Into<String>,
        factory: impl Fn(&Scope<E>, &E, usize, &[E]) -> HandlerSet<E> + 'static,
    ) -> Self {
        self.entries
            .push((selector.into(), EventConfig::PerElement(Rc::new(factory))));
        self
    }

    /// Whether no selector is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[(String, EventConfig<E>)] {
        &self.entries
    }
}
