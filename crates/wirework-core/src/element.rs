#![forbid(unsafe_code)]

//! Element capability trait: the contract a tree node must satisfy to be
//! wired.
//!
//! The default document-tree method names (`querySelectorAll`,
//! `addEventListener`, `removeEventListener`, `dispatchEvent`, "has a
//! parent node") map onto [`query`](Element::query),
//! [`listen`](Element::listen), [`unlisten`](Element::unlisten),
//! [`notify`](Element::notify), and [`is_attached`](Element::is_attached).
//! Any element-like object can be wired by implementing this trait, which
//! is how the engine runs against mocks and non-document trees.

use std::rc::Rc;

use crate::event::Event;

/// Stable identity key for an element, normally pointer-derived. Two handles
/// to the same underlying element must report the same key; bookkeeping is
/// keyed by identity, never by value.
pub type ElementKey = usize;

/// Handle returned by [`Element::listen`]; the only way to detach the same
/// listener later.
pub type ListenerId = u64;

/// A listener as the element stores it, scope binding already applied.
pub type BoundListener = Rc<dyn Fn(&Event)>;

/// Capabilities the wiring engine requires from a tree node.
pub trait Element: Clone + 'static {
    /// Identity key for this element.
    fn key(&self) -> ElementKey;

    /// All descendants matching `selector`, in document order, excluding
    /// the element itself. The root selector `"."` is resolved by the
    /// engine and never reaches this method.
    fn query(&self, selector: &str) -> Vec<Self>;

    /// Attach a listener for `event_type` and return its detach handle.
    fn listen(&self, event_type: &str, listener: BoundListener) -> ListenerId;

    /// Detach a previously attached listener. Unknown handles are ignored.
    fn unlisten(&self, event_type: &str, listener: ListenerId);

    /// Dispatch an event to this element's own listeners. Returns `false`
    /// when the element does not support dispatch, in which case
    /// [`fire`](crate::circuit::Circuit::fire) skips it.
    fn notify(&self, event: &Event) -> bool;

    /// Whether the element is still part of a live tree. This is the
    /// default orphan validator used by
    /// [`clean`](crate::circuit::Circuit::clean).
    fn is_attached(&self) -> bool;
}
