#![forbid(unsafe_code)]

//! Scope view: the execution context handed to every wired listener.
//!
//! The scope is an explicit accessor object (`get` / `set` / `delete`)
//! backed by three layers, probed in order:
//!
//! 1. two reserved capabilities — [`RESERVED_CIRCUIT`] resolves to the
//!    owning circuit and [`RESERVED_FIRE`] to a bound re-dispatch handle —
//!    consulted only when the seed does not define the name itself
//!    (explicit seed definitions win);
//! 2. the owned-node map, by node identifier;
//! 3. the seed map of application values.
//!
//! Writes always land in the seed (default object semantics), so writing a
//! reserved name shadows the capability from then on. Deleting a name that
//! matches an owned node dewires that element and forgets it; any other
//! delete falls through to the seed.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::circuit::{Circuit, CircuitInner, FireOptions};
use crate::element::Element;
use crate::error::CircuitError;
use crate::event::Event;

/// Reserved scope name resolving to the circuit back-reference.
pub const RESERVED_CIRCUIT: &str = "top_";

/// Reserved scope name resolving to the bound re-dispatch capability.
pub const RESERVED_FIRE: &str = "fire_";

/// A callback living in the scope: runs with the circuit scope and the
/// triggering event.
pub type ScopeFn<E> = Rc<dyn Fn(&Scope<E>, &Event)>;

/// An application value seeded into the scope at construction or written
/// later with [`Scope::set`].
pub enum SeedValue<E: Element> {
    /// Plain data.
    Value(Value),
    /// A callable; participates in naming conflicts, invocable through
    /// [`Scope::invoke`].
    Func(ScopeFn<E>),
}

impl<E: Element> Clone for SeedValue<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(v) => Self::Value(v.clone()),
            Self::Func(f) => Self::Func(Rc::clone(f)),
        }
    }
}

impl<E: Element> std::fmt::Debug for SeedValue<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Bound re-dispatch capability exposed under [`RESERVED_FIRE`].
pub struct FireHandle<E: Element> {
    circuit: Circuit<E>,
}

impl<E: Element> Clone for FireHandle<E> {
    fn clone(&self) -> Self {
        Self {
            circuit: self.circuit.clone(),
        }
    }
}

impl<E: Element> FireHandle<E> {
    /// Re-dispatch `event` through the owning circuit.
    pub fn fire(&self, event: &Event) -> Result<usize, CircuitError> {
        self.circuit.fire(event)
    }

    /// Re-dispatch with explicit options.
    pub fn fire_with(&self, event: &Event, opts: FireOptions) -> Result<usize, CircuitError> {
        self.circuit.fire_with(event, opts)
    }
}

/// Result of a [`Scope::get`] lookup.
pub enum ScopeEntry<E: Element> {
    /// The circuit back-reference ([`RESERVED_CIRCUIT`]).
    Circuit(Circuit<E>),
    /// The bound re-dispatch handle ([`RESERVED_FIRE`]).
    Fire(FireHandle<E>),
    /// An owned element, by node identifier.
    Node(E),
    /// A plain seed value.
    Value(Value),
    /// A callable seed entry.
    Func(ScopeFn<E>),
}

/// The scope view over a circuit. Cheaply cloneable; all clones share the
/// same circuit state.
pub struct Scope<E: Element> {
    pub(crate) inner: Rc<RefCell<CircuitInner<E>>>,
}

impl<E: Element> Clone for Scope<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Element> Scope<E> {
    fn circuit_handle(&self) -> Circuit<E> {
        Circuit::from_inner(Rc::clone(&self.inner))
    }

    /// Look up `name`: reserved capabilities (unless the seed shadows
    /// them), then owned nodes, then the seed.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ScopeEntry<E>> {
        let inner = self.inner.borrow();
        if !inner.seed.contains_key(name) {
            if name == RESERVED_CIRCUIT {
                return Some(ScopeEntry::Circuit(self.circuit_handle()));
            }
            if name == RESERVED_FIRE {
                return Some(ScopeEntry::Fire(FireHandle {
                    circuit: self.circuit_handle(),
                }));
            }
        }
        if let Some(element) = inner.nodes.get(name) {
            return Some(ScopeEntry::Node(element.clone()));
        }
        match inner.seed.get(name) {
            Some(SeedValue::Value(v)) => Some(ScopeEntry::Value(v.clone())),
            Some(SeedValue::Func(f)) => Some(ScopeEntry::Func(Rc::clone(f))),
            None => None,
        }
    }

    /// Owned element by node identifier, skipping reserved and seed layers.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<E> {
        self.inner.borrow().nodes.get(name).cloned()
    }

    /// Write a seed entry. Writes always land in the seed, even for
    /// reserved names, which are shadowed from then on.
    pub fn set(&self, name: impl Into<String>, value: SeedValue<E>) {
        self.inner.borrow_mut().seed.insert(name.into(), value);
    }

    /// Delete `name`. A name matching an owned node dewires that element
    /// and removes it from the node map; any other name falls through to
    /// seed removal. Returns whether anything was removed.
    pub fn delete(&self, name: &str) -> bool {
        let owned = self.inner.borrow().nodes.get(name).cloned();
        if let Some(element) = owned {
            let circuit = self.circuit_handle();
            circuit.dewire(&element);
            let mut inner = self.inner.borrow_mut();
            inner.nodes.remove(name);
            inner.order.retain(|id| id != name);
            inner.wires.remove(&element.key());
            return true;
        }
        self.inner.borrow_mut().seed.remove(name).is_some()
    }

    /// The owning circuit, regardless of seed shadowing.
    #[must_use]
    pub fn circuit(&self) -> Circuit<E> {
        self.circuit_handle()
    }

    /// Re-dispatch `event` through the owning circuit.
    pub fn fire(&self, event: &Event) -> Result<usize, CircuitError> {
        self.circuit_handle().fire(event)
    }

    /// Re-dispatch with explicit options.
    pub fn fire_with(&self, event: &Event, opts: FireOptions) -> Result<usize, CircuitError> {
        self.circuit_handle().fire_with(event, opts)
    }

    /// Invoke a callable found under `name` — a `Func` seed entry, or the
    /// reserved fire capability (which re-dispatches `event`). Returns
    /// whether a callable was found.
    pub fn invoke(&self, name: &str, event: &Event) -> bool {
        match self.get(name) {
            Some(ScopeEntry::Func(f)) => {
                f(self, event);
                true
            }
            Some(ScopeEntry::Fire(handle)) => {
                let _ = handle.fire(event);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, CircuitOptions};
    use crate::config::{EventConfigs, HandlerSet};
    use crate::testkit::MockElement;
    use serde_json::json;
    use std::cell::Cell;

    fn wired_root() -> (Circuit<MockElement>, MockElement) {
        let button = MockElement::new("button");
        let root = MockElement::new("root").with_child(button.clone());
        let configs = EventConfigs::new()
            .fixed("button", HandlerSet::new().id("save").on("click", |_, _| {}));
        let circuit = Circuit::new(root, configs, CircuitOptions::new()).expect("wire");
        (circuit, button)
    }

    #[test]
    fn reserved_circuit_resolves_without_seed() {
        let (circuit, _) = wired_root();
        let scope = circuit.scope();
        assert!(matches!(
            scope.get(RESERVED_CIRCUIT),
            Some(ScopeEntry::Circuit(_))
        ));
        assert!(matches!(scope.get(RESERVED_FIRE), Some(ScopeEntry::Fire(_))));
    }

    #[test]
    fn seed_definition_wins_over_reserved_name() {
        let root = MockElement::new("root");
        let options = CircuitOptions::new().seed_value(RESERVED_CIRCUIT, json!("mine"));
        let circuit = Circuit::new(root, EventConfigs::new(), options).expect("wire");
        let scope = circuit.scope();
        match scope.get(RESERVED_CIRCUIT) {
            Some(ScopeEntry::Value(v)) => assert_eq!(v, json!("mine")),
            _ => panic!("seed definition must shadow the reserved name"),
        }
    }

    #[test]
    fn set_shadows_reserved_name_afterwards() {
        let (circuit, _) = wired_root();
        let scope = circuit.scope();
        scope.set(RESERVED_FIRE, SeedValue::Value(json!(1)));
        assert!(matches!(scope.get(RESERVED_FIRE), Some(ScopeEntry::Value(_))));
    }

    #[test]
    fn node_lookup_by_identifier() {
        let (circuit, button) = wired_root();
        let scope = circuit.scope();
        match scope.get("save") {
            Some(ScopeEntry::Node(el)) => assert_eq!(el.key(), button.key()),
            _ => panic!("expected owned node"),
        }
        assert!(scope.node("save").is_some());
        assert!(scope.get("missing").is_none());
    }

    #[test]
    fn delete_of_node_identifier_dewires_the_element() {
        let (circuit, button) = wired_root();
        let scope = circuit.scope();
        assert_eq!(button.listener_count("click"), 1);
        assert!(scope.delete("save"));
        assert_eq!(button.listener_count("click"), 0);
        assert!(scope.get("save").is_none());
        assert_eq!(circuit.node_count(), 0);
    }

    #[test]
    fn delete_falls_through_to_seed() {
        let root = MockElement::new("root");
        let options = CircuitOptions::new().seed_value("theme", json!("dark"));
        let circuit = Circuit::new(root, EventConfigs::new(), options).expect("wire");
        let scope = circuit.scope();
        assert!(scope.delete("theme"));
        assert!(!scope.delete("theme"));
        assert!(!scope.delete("never-existed"));
    }

    #[test]
    fn invoke_runs_func_seed_entries() {
        let hits = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&hits);
        let root = MockElement::new("root");
        let options = CircuitOptions::new().seed_func("refresh", move |_, _| {
            seen.set(seen.get() + 1);
        });
        let circuit = Circuit::new(root, EventConfigs::new(), options).expect("wire");
        let scope = circuit.scope();
        assert!(scope.invoke("refresh", &Event::new("tick")));
        assert!(!scope.invoke("missing", &Event::new("tick")));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn fire_handle_re_dispatches() {
        let hits = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&hits);
        let button = MockElement::new("button");
        let root = MockElement::new("root").with_child(button);
        let configs = EventConfigs::new().fixed(
            "button",
            HandlerSet::new().on("ping", move |_, _| seen.set(seen.get() + 1)),
        );
        let circuit = Circuit::new(root, configs, CircuitOptions::new()).expect("wire");
        let scope = circuit.scope();
        match scope.get(RESERVED_FIRE) {
            Some(ScopeEntry::Fire(handle)) => {
                assert_eq!(handle.fire(&Event::new("ping")).expect("fire"), 1);
            }
            _ => panic!("expected fire handle"),
        }
        assert_eq!(hits.get(), 1);
    }
}
