#![forbid(unsafe_code)]

//! Core: the declarative event-wiring engine.
//!
//! A [`Circuit`] scans a root element for selector matches, attaches the
//! declared listeners, and tracks which elements it owns so they can be
//! detached individually ([`Circuit::dewire`]), swept when they fall out of
//! the live tree ([`Circuit::clean`]), or torn down all at once
//! ([`Circuit::delete`]). A named event can be re-dispatched to every owned
//! element that declared a listener for it ([`Circuit::fire`]), independent
//! of any native event propagation.
//!
//! The engine is generic over [`Element`], so it runs against any tree that
//! can query descendants, attach/detach listeners, and dispatch events —
//! a real document tree, the in-memory tree in `wirework-tree`, or a mock.

pub mod circuit;
pub mod config;
pub mod element;
pub mod error;
pub mod event;
pub mod ids;
pub mod logging;
pub mod scope;

#[cfg(test)]
pub(crate) mod testkit;

pub use circuit::{Circuit, CircuitOptions, FireOptions, wire};
pub use config::{EventConfig, EventConfigs, HandlerSet, ROOT_SELECTOR};
pub use element::{BoundListener, Element, ElementKey, ListenerId};
pub use error::CircuitError;
pub use event::Event;
pub use ids::IdAllocator;
pub use scope::{
    FireHandle, RESERVED_CIRCUIT, RESERVED_FIRE, Scope, ScopeEntry, ScopeFn, SeedValue,
};
