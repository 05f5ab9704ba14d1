#![forbid(unsafe_code)]

//! Node identifier allocation.
//!
//! Elements wired without an explicit identifier get `node-<n>` where `n`
//! comes from a monotonic counter. The default allocator is process-wide:
//! identifiers are unique across every circuit in the process and are never
//! reused or decremented. Tests inject a scoped allocator for deterministic
//! numbering.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Source of auto-generated node identifiers.
#[derive(Clone, Debug, Default)]
pub enum IdAllocator {
    /// Process-wide counter shared by every circuit (the default).
    #[default]
    Global,
    /// Private counter, not shared with any other allocator.
    Scoped(Arc<AtomicU64>),
}

impl IdAllocator {
    /// A fresh private counter starting at 1.
    #[must_use]
    pub fn scoped() -> Self {
        Self::Scoped(Arc::new(AtomicU64::new(1)))
    }

    /// Next counter value. Monotonic, never reused.
    #[must_use]
    pub fn next(&self) -> u64 {
        match self {
            Self::Global => NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            Self::Scoped(counter) => counter.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Next counter value formatted as a node identifier.
    #[must_use]
    pub fn node_id(&self) -> String {
        format!("node-{}", self.next())
    }
}
