#![forbid(unsafe_code)]

//! Error taxonomy: synchronous exceptions, fail-fast, nothing caught or
//! retried inside the engine.

/// Errors surfaced by [`Circuit`](crate::circuit::Circuit) operations.
///
/// Every failure propagates immediately to the direct caller. There is no
/// partial-failure mode: `wire` either attaches all declared pairs or
/// returns partway with the earlier pairs still attached (no rollback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// An explicit node identifier collides with a reserved scope name, an
    /// already-owned node identifier, or a function-valued seed entry.
    NamingConflict {
        /// The offending identifier.
        id: String,
    },
    /// `fire` was called with an event whose type is empty.
    InvalidEvent,
    /// The circuit was torn down with `delete` and cannot be reused.
    Deleted,
}

impl std::fmt::Display for CircuitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NamingConflict { id } => write!(f, "conflicting node id {id:?}"),
            Self::InvalidEvent => write!(f, "invalid event: empty type"),
            Self::Deleted => write!(f, "circuit already deleted"),
        }
    }
}

impl std::error::Error for CircuitError {}
