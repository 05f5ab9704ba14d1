#![forbid(unsafe_code)]

//! The wiring engine.
//!
//! A [`Circuit`] is built from a root element, an ordered
//! [`EventConfigs`] map, and [`CircuitOptions`]. Construction resolves each
//! selector, normalizes the declared handler sets, and attaches every
//! listener pair; from then on the circuit is the single source of truth
//! for which elements it owns and which `(event type, listener)` pairs are
//! attached to each of them.
//!
//! # Invariants
//!
//! 1. `wires` keys and `nodes` values correspond one-to-one while owned.
//! 2. An element is registered at most once; re-wiring appends listener
//!    pairs under the original identifier.
//! 3. Node identifiers are immutable once assigned.
//! 4. Auto identifiers are monotonic and never reused (see
//!    [`IdAllocator`]).
//!
//! # Re-entrancy
//!
//! Every operation is synchronous and single-threaded, but a listener
//! invoked during [`fire`](Circuit::fire) may itself wire, dewire, clean,
//! or delete the same circuit. The engine snapshots its candidate list
//! before any call-out and never holds interior borrows across one, so
//! such mutations are safe — they take effect from the next fire or clean,
//! not the one in progress.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::config::{self, EventConfig, EventConfigs, HandlerSet, ROOT_SELECTOR};
use crate::element::{BoundListener, Element, ElementKey, ListenerId};
use crate::error::CircuitError;
use crate::event::Event;
use crate::ids::IdAllocator;
use crate::scope::{RESERVED_CIRCUIT, RESERVED_FIRE, Scope, ScopeFn, SeedValue};

#[cfg(feature = "tracing")]
use crate::logging::{debug, trace, warn};
#[cfg(not(feature = "tracing"))]
use crate::{debug, trace, warn};

/// Wire a root element: shorthand for [`Circuit::new`].
pub fn wire<E: Element>(
    root: E,
    configs: EventConfigs<E>,
    options: CircuitOptions<E>,
) -> Result<Circuit<E>, CircuitError> {
    Circuit::new(root, configs, options)
}

// ─── Options ─────────────────────────────────────────────────────────────────

/// Construction options: the scope seed, the orphan validator, and the
/// node-id allocator.
pub struct CircuitOptions<E: Element> {
    seed: Vec<(String, SeedValue<E>)>,
    validator: Option<Rc<dyn Fn(&E) -> bool>>,
    ids: IdAllocator,
}

impl<E: Element> Default for CircuitOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> Clone for CircuitOptions<E> {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed.clone(),
            validator: self.validator.clone(),
            ids: self.ids.clone(),
        }
    }
}

impl<E: Element> CircuitOptions<E> {
    /// Defaults: empty seed, `Element::is_attached` as the orphan
    /// validator, the process-wide id allocator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: Vec::new(),
            validator: None,
            ids: IdAllocator::default(),
        }
    }

    /// Seed the scope with a plain value.
    #[must_use]
    pub fn seed_value(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.seed.push((name.into(), SeedValue::Value(value)));
        self
    }

    /// Seed the scope with a callable.
    #[must_use]
    pub fn seed_func(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Scope<E>, &Event) + 'static,
    ) -> Self {
        self.seed
            .push((name.into(), SeedValue::Func(Rc::new(f))));
        self
    }

    /// Whether a seed entry with `name` was declared.
    #[must_use]
    pub fn has_seed(&self, name: &str) -> bool {
        self.seed.iter().any(|(n, _)| n == name)
    }

    /// Replace the orphan validator used by [`Circuit::clean`].
    #[must_use]
    pub fn validator(mut self, f: impl Fn(&E) -> bool + 'static) -> Self {
        self.validator = Some(Rc::new(f));
        self
    }

    /// Replace the node-id allocator (scoped allocators keep test ids
    /// deterministic).
    #[must_use]
    pub fn id_allocator(mut self, ids: IdAllocator) -> Self {
        self.ids = ids;
        self
    }
}

/// Options for [`Circuit::fire_with`] and
/// [`Circuit::nodes_listening_to`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FireOptions {
    /// Exclude the root element from dispatch.
    pub skip_root: bool,
}

impl FireOptions {
    /// Options that exclude the root element.
    #[must_use]
    pub fn skipping_root() -> Self {
        Self { skip_root: true }
    }
}

// ─── Interior state ──────────────────────────────────────────────────────────

pub(crate) struct WireRecord {
    pub(crate) node_id: String,
    pub(crate) pairs: Vec<(String, ListenerId)>,
}

pub(crate) struct CircuitInner<E: Element> {
    pub(crate) root: Option<E>,
    /// Node identifier -> owned element.
    pub(crate) nodes: AHashMap<String, E>,
    /// Node identifiers in registration order.
    pub(crate) order: Vec<String>,
    /// Element identity -> attached listener pairs.
    pub(crate) wires: AHashMap<ElementKey, WireRecord>,
    pub(crate) seed: AHashMap<String, SeedValue<E>>,
    pub(crate) validator: Rc<dyn Fn(&E) -> bool>,
    pub(crate) ids: IdAllocator,
    pub(crate) deleted: bool,
}

// ─── Circuit ─────────────────────────────────────────────────────────────────

/// The wiring engine. Cheaply cloneable; all clones share the same state.
pub struct Circuit<E: Element> {
    inner: Rc<RefCell<CircuitInner<E>>>,
}

impl<E: Element> Clone for Circuit<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Element> Circuit<E> {
    /// Scan `root` with `configs` and attach every declared listener.
    ///
    /// For each `(selector, config)` entry, matching elements are resolved
    /// via [`Element::query`] ([`ROOT_SELECTOR`] resolves to `root` itself
    /// without querying). A [`EventConfig::PerElement`] factory runs once
    /// per matched element, bound to the scope. Explicit `_id` metadata
    /// that collides with a reserved scope name, an owned node, or a
    /// function-valued seed entry fails with
    /// [`CircuitError::NamingConflict`].
    pub fn new(
        root: E,
        configs: EventConfigs<E>,
        options: CircuitOptions<E>,
    ) -> Result<Self, CircuitError> {
        let validator = options
            .validator
            .unwrap_or_else(|| Rc::new(|element: &E| element.is_attached()));
        let inner = Rc::new(RefCell::new(CircuitInner {
            root: Some(root.clone()),
            nodes: AHashMap::new(),
            order: Vec::new(),
            wires: AHashMap::new(),
            seed: options.seed.into_iter().collect(),
            validator,
            ids: options.ids,
            deleted: false,
        }));
        let circuit = Self { inner };

        for (selector, cfg) in configs.entries() {
            let matched = if selector.as_str() == ROOT_SELECTOR {
                vec![root.clone()]
            } else {
                root.query(selector)
            };
            match cfg {
                EventConfig::Fixed(set) => {
                    // Conflicts in a fixed set are detected even when the
                    // selector matched nothing.
                    let (_, meta) = config::normalize(set);
                    if let Some(id) = &meta.id {
                        circuit.ensure_id_free(id)?;
                    }
                    for element in &matched {
                        circuit.wire(element, set.clone())?;
                    }
                }
                EventConfig::PerElement(factory) => {
                    let scope = circuit.scope();
                    for (index, element) in matched.iter().enumerate() {
                        let set = factory(&scope, element, index, &matched);
                        circuit.wire(element, set)?;
                    }
                }
            }
        }
        trace!(nodes = circuit.node_count(), "circuit wired");
        Ok(circuit)
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<CircuitInner<E>>>) -> Self {
        Self { inner }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Scope view backing listener execution.
    #[must_use]
    pub fn scope(&self) -> Scope<E> {
        Scope {
            inner: Rc::clone(&self.inner),
        }
    }

    /// The root element, until [`delete`](Self::delete).
    #[must_use]
    pub fn root(&self) -> Option<E> {
        self.inner.borrow().root.clone()
    }

    /// Owned element by node identifier.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<E> {
        self.inner.borrow().nodes.get(id).cloned()
    }

    /// Node identifiers in registration order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        self.inner.borrow().order.clone()
    }

    /// Number of owned elements.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    /// Event types currently recorded for `element`, duplicates included.
    #[must_use]
    pub fn wired_event_types(&self, element: &E) -> Vec<String> {
        self.inner
            .borrow()
            .wires
            .get(&element.key())
            .map(|record| record.pairs.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether [`delete`](Self::delete) has torn this circuit down.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.borrow().deleted
    }

    /// Owned elements with at least one recorded pair for `event_type`,
    /// optionally excluding the root. Pure query.
    #[must_use]
    pub fn nodes_listening_to(&self, event_type: &str, skip_root: bool) -> Vec<E> {
        let inner = self.inner.borrow();
        if inner.deleted {
            return Vec::new();
        }
        let root_key = inner.root.as_ref().map(Element::key);
        inner
            .order
            .iter()
            .filter_map(|id| inner.nodes.get(id))
            .filter(|element| {
                if skip_root && Some(element.key()) == root_key {
                    return false;
                }
                inner
                    .wires
                    .get(&element.key())
                    .is_some_and(|record| record.pairs.iter().any(|(t, _)| t == event_type))
            })
            .cloned()
            .collect()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Idempotent registration + attach.
    ///
    /// An unowned element is registered under its explicit `_id` (conflict
    /// checked) or a fresh auto identifier; an already-owned element keeps
    /// its original identifier and the new pairs are appended. Every
    /// declared pair attaches — identical `(type, handler)` pairs attach
    /// as many times as declared.
    pub fn wire(&self, element: &E, set: HandlerSet<E>) -> Result<String, CircuitError> {
        let (listeners, meta) = config::normalize(&set);
        let key = element.key();
        let node_id = {
            let mut inner = self.inner.borrow_mut();
            if inner.deleted {
                return Err(CircuitError::Deleted);
            }
            if let Some(record) = inner.wires.get(&key) {
                record.node_id.clone()
            } else {
                let id = match meta.id {
                    Some(id) => {
                        Self::check_conflict(&inner, &id)?;
                        id
                    }
                    None => inner.ids.node_id(),
                };
                inner.nodes.insert(id.clone(), element.clone());
                inner.order.push(id.clone());
                inner.wires.insert(
                    key,
                    WireRecord {
                        node_id: id.clone(),
                        pairs: Vec::new(),
                    },
                );
                id
            }
        };
        for (event_type, listener) in listeners {
            let bound = self.bind(listener);
            let listener_id = element.listen(&event_type, bound);
            let mut inner = self.inner.borrow_mut();
            if let Some(record) = inner.wires.get_mut(&key) {
                record.pairs.push((event_type, listener_id));
            }
        }
        trace!(node_id = %node_id, "element wired");
        Ok(node_id)
    }

    /// Bind a scope-taking listener into the form elements store. The
    /// binding holds the circuit weakly: a stale listener that outlives
    /// its circuit becomes a no-op instead of keeping the state alive.
    fn bind(&self, listener: ScopeFn<E>) -> BoundListener {
        let weak = Rc::downgrade(&self.inner);
        Rc::new(move |event: &Event| {
            if let Some(inner) = weak.upgrade() {
                let scope = Scope { inner };
                listener(&scope, event);
            }
        })
    }

    fn check_conflict(inner: &CircuitInner<E>, id: &str) -> Result<(), CircuitError> {
        let reserved = id == RESERVED_CIRCUIT || id == RESERVED_FIRE;
        let node_taken = inner.nodes.contains_key(id);
        let seed_func = matches!(inner.seed.get(id), Some(SeedValue::Func(_)));
        if reserved || node_taken || seed_func {
            warn!(id = %id, "node id conflict");
            return Err(CircuitError::NamingConflict { id: id.to_owned() });
        }
        Ok(())
    }

    fn ensure_id_free(&self, id: &str) -> Result<(), CircuitError> {
        Self::check_conflict(&self.inner.borrow(), id)
    }

    /// Detach every recorded pair from one owned element and clear its
    /// pair list. The element stays owned (its identifier remains in the
    /// node map). Returns `false` if the element is not owned.
    pub fn dewire(&self, element: &E) -> bool {
        let pairs = {
            let mut inner = self.inner.borrow_mut();
            match inner.wires.get_mut(&element.key()) {
                Some(record) => std::mem::take(&mut record.pairs),
                None => return false,
            }
        };
        for (event_type, listener_id) in &pairs {
            element.unlisten(event_type, *listener_id);
        }
        trace!(detached = pairs.len(), "element dewired");
        true
    }

    /// Full teardown: dewire every owned element, then discard the root
    /// and both registries. Terminal — mutating operations afterwards
    /// return [`CircuitError::Deleted`], queries return empty.
    pub fn delete(&self) {
        let elements: Vec<E> = {
            let inner = self.inner.borrow();
            if inner.deleted {
                return;
            }
            inner
                .order
                .iter()
                .filter_map(|id| inner.nodes.get(id).cloned())
                .collect()
        };
        for element in &elements {
            self.dewire(element);
        }
        let mut inner = self.inner.borrow_mut();
        inner.root = None;
        inner.nodes.clear();
        inner.order.clear();
        inner.wires.clear();
        inner.deleted = true;
        debug!("circuit deleted");
    }

    /// Orphan sweep: for every owned element except the root, dewire and
    /// forget it when the validator judges it detached from the live
    /// tree. Returns the number of elements removed.
    pub fn clean(&self) -> usize {
        let (candidates, validator, root_key) = {
            let inner = self.inner.borrow();
            if inner.deleted {
                return 0;
            }
            let candidates: Vec<(String, E)> = inner
                .order
                .iter()
                .filter_map(|id| inner.nodes.get(id).map(|el| (id.clone(), el.clone())))
                .collect();
            (
                candidates,
                Rc::clone(&inner.validator),
                inner.root.as_ref().map(Element::key),
            )
        };
        let mut removed = 0;
        for (id, element) in candidates {
            // The root is exempt regardless of the validator's verdict.
            if Some(element.key()) == root_key {
                continue;
            }
            if validator(&element) {
                continue;
            }
            self.dewire(&element);
            let mut inner = self.inner.borrow_mut();
            inner.nodes.remove(&id);
            inner.order.retain(|n| n != &id);
            inner.wires.remove(&element.key());
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, "clean swept orphans");
        }
        removed
    }

    /// Re-dispatch `event` to every owned element listening for its type.
    pub fn fire(&self, event: &Event) -> Result<usize, CircuitError> {
        self.fire_with(event, FireOptions::default())
    }

    /// Re-dispatch with explicit options. Rejects events with an empty
    /// type before any dispatch is attempted. The candidate list is
    /// snapshotted first, so listeners may freely mutate the circuit;
    /// their mutations apply from the next fire or clean. Returns the
    /// number of elements whose dispatch ran.
    pub fn fire_with(&self, event: &Event, opts: FireOptions) -> Result<usize, CircuitError> {
        if self.inner.borrow().deleted {
            return Err(CircuitError::Deleted);
        }
        if event.event_type().is_empty() {
            return Err(CircuitError::InvalidEvent);
        }
        let targets = self.nodes_listening_to(event.event_type(), opts.skip_root);
        let mut notified = 0;
        for element in targets {
            if element.notify(event) {
                notified += 1;
            }
        }
        trace!(event_type = %event.event_type(), notified, "fire");
        Ok(notified)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
