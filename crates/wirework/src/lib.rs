#![forbid(unsafe_code)]

//! Wirework public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    #[cfg(feature = "bus")]
    pub use wirework_bus as bus;
    #[cfg(feature = "component")]
    pub use wirework_component as component;
    pub use wirework_core as core;
    pub use wirework_tree as tree;
}
