#![forbid(unsafe_code)]

//! In-memory element tree for the wiring engine.
//!
//! [`TreeElement`] is a mutable node tree implementing
//! [`wirework_core::Element`]: selector queries, listener storage, local
//! event dispatch, and attachment tracking. [`selector`] holds the small
//! selector dialect the tree understands (tag, `#id`, `.class`, `*`,
//! compounds, comma-separated groups).
//!
//! The tree exists so circuits can be exercised without a browser: tests,
//! benchmarks, and headless embedders all run against it.

pub mod node;
pub mod selector;

pub use node::TreeElement;
pub use selector::{SelectorList, SimpleSelector};
