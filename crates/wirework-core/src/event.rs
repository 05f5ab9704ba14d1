#![forbid(unsafe_code)]

//! Event descriptor consumed and re-dispatched by the engine.

use serde_json::Value;

/// A synthetic event: a type string plus an opaque `detail` payload.
///
/// The engine only ever inspects the type; the detail passes through every
/// dispatch unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: String,
    detail: Value,
}

impl Event {
    /// Create an event with a null detail.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: Value::Null,
        }
    }

    /// Attach a detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    /// The event type. [`fire`](crate::circuit::Circuit::fire) rejects
    /// events with an empty type before any dispatch is attempted.
    #[inline]
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The pass-through payload.
    #[inline]
    #[must_use]
    pub fn detail(&self) -> &Value {
        &self.detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_defaults_to_null() {
        let ev = Event::new("ping");
        assert_eq!(ev.event_type(), "ping");
        assert_eq!(ev.detail(), &Value::Null);
    }

    #[test]
    fn detail_passes_through() {
        let ev = Event::new("change").with_detail(json!({ "value": 3 }));
        assert_eq!(ev.detail()["value"], 3);
    }
}
