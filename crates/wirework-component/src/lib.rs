#![forbid(unsafe_code)]

//! Wired-component lifecycle: a host element, a render function, and a
//! circuit rebuilt fresh on every render.
//!
//! A [`Component`] owns a host [`TreeElement`] and a render function that
//! produces the host's children. Mounting performs the first build and
//! announces `connected`; every (re)build deletes the previous circuit,
//! replaces the children, and wires a brand-new circuit over the host, so
//! listeners never survive a render they were not declared in. Unmounting
//! announces `disconnected` and tears the circuit down for good.
//!
//! Inside listeners the scope exposes two component capabilities unless the
//! caller seeds those names itself: [`SEED_BUILD`] rebuilds the component
//! and [`SEED_FIRE`] re-dispatches through the component (circuit minus
//! root, then the host), shadowing the engine's plain fire capability with
//! the component-shaped one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::json;

use wirework_core::{
    Circuit, CircuitError, CircuitOptions, Element, Event, EventConfigs, FireOptions,
    RESERVED_FIRE,
};
use wirework_tree::TreeElement;

/// Scope name of the rebuild capability seeded into every component
/// circuit.
pub const SEED_BUILD: &str = "build_";

/// Scope name of the component-shaped fire capability. Same name as the
/// engine's reserved fire, deliberately: the seed shadows it.
pub const SEED_FIRE: &str = RESERVED_FIRE;

/// Lifecycle event announced after the first build.
pub const EVENT_CONNECTED: &str = "connected";

/// Lifecycle event announced by [`Component::unmount`].
pub const EVENT_DISCONNECTED: &str = "disconnected";

/// Event announced by [`Component::set_attribute`] after the rebuild, with
/// `{name, value, old_value}` detail.
pub const EVENT_ATTRIBUTE_CHANGED: &str = "attribute_changed";

/// Render function: given the host, produce its children for this build.
pub type RenderFn = Rc<dyn Fn(&TreeElement) -> Vec<TreeElement>>;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The component has been unmounted; the operation needs a live circuit.
    Unmounted,
    /// The underlying circuit rejected the operation.
    Circuit(CircuitError),
}

impl std::fmt::Display for ComponentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmounted => write!(f, "component is unmounted"),
            Self::Circuit(e) => write!(f, "circuit error: {e}"),
        }
    }
}

impl std::error::Error for ComponentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Circuit(e) => Some(e),
            Self::Unmounted => None,
        }
    }
}

impl From<CircuitError> for ComponentError {
    fn from(e: CircuitError) -> Self {
        Self::Circuit(e)
    }
}

// ─── Component ───────────────────────────────────────────────────────────────

struct ComponentInner {
    host: TreeElement,
    render: RenderFn,
    configs: EventConfigs<TreeElement>,
    options: CircuitOptions<TreeElement>,
    circuit: Option<Circuit<TreeElement>>,
}

/// A mounted component. Cheaply cloneable; clones share lifecycle state.
pub struct Component {
    inner: Rc<RefCell<ComponentInner>>,
}

impl Clone for Component {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Component {
    /// Build the component for the first time and announce
    /// [`EVENT_CONNECTED`] through it.
    ///
    /// `configs` and `options` are kept and reused by every rebuild; the
    /// seed declared in `options` therefore re-seeds each new circuit.
    pub fn mount(
        host: TreeElement,
        render: impl Fn(&TreeElement) -> Vec<TreeElement> + 'static,
        configs: EventConfigs<TreeElement>,
        options: CircuitOptions<TreeElement>,
    ) -> Result<Self, ComponentError> {
        let component = Self {
            inner: Rc::new(RefCell::new(ComponentInner {
                host,
                render: Rc::new(render),
                configs,
                options,
                circuit: None,
            })),
        };
        component.build()?;
        component.fire(&Event::new(EVENT_CONNECTED))?;
        Ok(component)
    }

    /// Tear down the previous circuit, re-render the host's children, and
    /// wire a fresh circuit over the host. Errors leave the component
    /// unmounted-like (no live circuit) rather than half-wired.
    pub fn build(&self) -> Result<(), ComponentError> {
        // Snapshot collaborators first: render and wiring run user code
        // that may call back into this component.
        let (host, render, configs, mut options, previous) = {
            let inner = self.inner.borrow();
            (
                inner.host.clone(),
                Rc::clone(&inner.render),
                inner.configs.clone(),
                inner.options.clone(),
                inner.circuit.clone(),
            )
        };
        self.inner.borrow_mut().circuit = None;
        if let Some(circuit) = previous {
            circuit.delete();
        }

        host.clear_children();
        for child in render(&host) {
            host.append_child(&child);
        }

        // Component capabilities, unless the caller claimed the names.
        if !options.has_seed(SEED_BUILD) {
            let weak = Rc::downgrade(&self.inner);
            options = options.seed_func(SEED_BUILD, move |_, _| {
                if let Some(component) = Self::upgrade(&weak) {
                    let _ = component.build();
                }
            });
        }
        if !options.has_seed(SEED_FIRE) {
            let weak = Rc::downgrade(&self.inner);
            options = options.seed_func(SEED_FIRE, move |_, event| {
                if let Some(component) = Self::upgrade(&weak) {
                    let _ = component.fire(event);
                }
            });
        }

        let circuit = Circuit::new(host, configs, options)?;
        self.inner.borrow_mut().circuit = Some(circuit);
        Ok(())
    }

    fn upgrade(weak: &Weak<RefCell<ComponentInner>>) -> Option<Component> {
        weak.upgrade().map(|inner| Component { inner })
    }

    /// Re-dispatch `event` through the circuit (root excluded), then on the
    /// host element itself. Returns the number of elements notified,
    /// host included.
    pub fn fire(&self, event: &Event) -> Result<usize, ComponentError> {
        let circuit = self.circuit().ok_or(ComponentError::Unmounted)?;
        let mut notified = circuit.fire_with(event, FireOptions::skipping_root())?;
        if self.host().notify(event) {
            notified += 1;
        }
        Ok(notified)
    }

    /// Update a host attribute, rebuild, and announce
    /// [`EVENT_ATTRIBUTE_CHANGED`] with `{name, value, old_value}` detail.
    pub fn set_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ComponentError> {
        if !self.is_mounted() {
            return Err(ComponentError::Unmounted);
        }
        let name = name.into();
        let value = value.into();
        let old_value = self.host().set_attr(name.clone(), value.clone());
        self.build()?;
        let event = Event::new(EVENT_ATTRIBUTE_CHANGED)
            .with_detail(json!({ "name": name, "value": value, "old_value": old_value }));
        self.fire(&event)?;
        Ok(())
    }

    /// Announce [`EVENT_DISCONNECTED`], then delete the circuit. Terminal:
    /// later mutating calls return [`ComponentError::Unmounted`].
    pub fn unmount(&self) {
        let Some(circuit) = self.inner.borrow_mut().circuit.take() else {
            return;
        };
        let event = Event::new(EVENT_DISCONNECTED);
        let _ = circuit.fire_with(&event, FireOptions::skipping_root());
        self.host().notify(&event);
        circuit.delete();
    }

    /// The host element.
    #[must_use]
    pub fn host(&self) -> TreeElement {
        self.inner.borrow().host.clone()
    }

    /// The live circuit, while mounted.
    #[must_use]
    pub fn circuit(&self) -> Option<Circuit<TreeElement>> {
        self.inner.borrow().circuit.clone()
    }

    /// Scope view of the live circuit.
    #[must_use]
    pub fn scope(&self) -> Option<wirework_core::Scope<TreeElement>> {
        self.circuit().map(|c| c.scope())
    }

    /// Whether a live circuit exists.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.borrow().circuit.is_some()
    }
}
