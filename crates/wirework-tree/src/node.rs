#![forbid(unsafe_code)]

//! Mutable element tree node.
//!
//! A [`TreeElement`] is a shared handle (clones alias the same node) over a
//! tag, optional id, classes, attributes, children, and per-event listener
//! lists. Parents are held weakly, so dropping a subtree's last external
//! handle frees it; attachment is "has a living parent", which is what the
//! engine's default orphan validator checks.
//!
//! # Invariants
//!
//! - A node has at most one parent; [`append_child`](TreeElement::append_child)
//!   detaches from any previous parent first and refuses cycles.
//! - Listener handles are process-unique; detach is by handle, never by
//!   callback identity.
//! - Dispatch snapshots the listener list first, so a listener may detach
//!   itself or its siblings without affecting the dispatch in progress.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use wirework_core::{BoundListener, Element, ElementKey, Event, ListenerId};

use crate::selector;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: AHashMap<String, String>,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<TreeElement>,
    listeners: AHashMap<String, Vec<(ListenerId, BoundListener)>>,
}

/// Shared handle to one tree node.
pub struct TreeElement {
    inner: Rc<RefCell<NodeData>>,
}

impl Clone for TreeElement {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for TreeElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("TreeElement")
            .field("tag", &data.tag)
            .field("id", &data.id)
            .field("classes", &data.classes)
            .field("children", &data.children.len())
            .finish()
    }
}

impl TreeElement {
    /// A detached node with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeData {
                tag: tag.into(),
                id: None,
                classes: Vec::new(),
                attrs: AHashMap::new(),
                parent: Weak::new(),
                children: Vec::new(),
                listeners: AHashMap::new(),
            })),
        }
    }

    /// Builder: set the element id.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.inner.borrow_mut().id = Some(id.into());
        self
    }

    /// Builder: add a class.
    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.inner.borrow_mut().classes.push(class.into());
        self
    }

    /// Builder: set an attribute.
    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .borrow_mut()
            .attrs
            .insert(name.into(), value.into());
        self
    }

    /// Builder: append a child.
    #[must_use]
    pub fn with_child(self, child: TreeElement) -> Self {
        self.append_child(&child);
        self
    }

    /// The tag name.
    #[must_use]
    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    /// The element id, if set.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.inner.borrow().id.clone()
    }

    /// Whether `class` is present.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.inner.borrow().classes.iter().any(|c| c == class)
    }

    /// Attribute value, if set.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.inner.borrow().attrs.get(name).cloned()
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner
            .borrow_mut()
            .attrs
            .insert(name.into(), value.into())
    }

    /// Remove an attribute, returning the removed value.
    pub fn remove_attr(&self, name: &str) -> Option<String> {
        self.inner.borrow_mut().attrs.remove(name)
    }

    /// The parent, while attached.
    #[must_use]
    pub fn parent(&self) -> Option<TreeElement> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| TreeElement { inner })
    }

    /// Direct children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<TreeElement> {
        self.inner.borrow().children.clone()
    }

    /// Append `child`, detaching it from any previous parent. Appending a
    /// node to itself or to one of its own descendants is refused.
    pub fn append_child(&self, child: &TreeElement) -> bool {
        if self.is_same(child) || child.is_ancestor_of(self) {
            return false;
        }
        child.detach();
        child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        self.inner.borrow_mut().children.push(child.clone());
        true
    }

    /// Unlink from the parent, if any. Listeners stay attached; only the
    /// tree position changes.
    pub fn detach(&self) {
        let Some(parent) = self.parent() else { return };
        self.inner.borrow_mut().parent = Weak::new();
        parent
            .inner
            .borrow_mut()
            .children
            .retain(|c| !c.is_same(self));
    }

    /// Detach every direct child.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut self.inner.borrow_mut().children);
        for child in &children {
            child.inner.borrow_mut().parent = Weak::new();
        }
    }

    /// All descendants in document (preorder) order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Vec<TreeElement> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<TreeElement>) {
        for child in self.inner.borrow().children.iter() {
            out.push(child.clone());
            child.collect_descendants(out);
        }
    }

    /// Number of listeners currently attached for `event_type`.
    #[must_use]
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(event_type)
            .map_or(0, Vec::len)
    }

    fn is_same(&self, other: &TreeElement) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn is_ancestor_of(&self, other: &TreeElement) -> bool {
        let mut cursor = other.parent();
        while let Some(node) = cursor {
            if node.is_same(self) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    fn matches_any(&self, list: &selector::SelectorList) -> bool {
        let data = self.inner.borrow();
        list.compounds
            .iter()
            .any(|c| selector::matches(c, &data.tag, data.id.as_deref(), &data.classes))
    }
}

impl Element for TreeElement {
    fn key(&self) -> ElementKey {
        Rc::as_ptr(&self.inner) as ElementKey
    }

    fn query(&self, selector: &str) -> Vec<Self> {
        let Some(list) = selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants()
            .into_iter()
            .filter(|el| el.matches_any(&list))
            .collect()
    }

    fn listen(&self, event_type: &str, listener: BoundListener) -> ListenerId {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        self.inner
            .borrow_mut()
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
        let snapshot: Vec<BoundListener> = self
            .inner
            .borrow()
            .listeners
            .get(event.event_type())
            .map(|list| list.iter().map(|(_, f)| Rc::clone(f)).collect())
            .unwrap_or_default();
        for listener in snapshot {
            listener(event);
        }
        true
    }

    fn is_attached(&self) -> bool {
        self.inner.borrow().parent.upgrade().is_some()
    }
}
