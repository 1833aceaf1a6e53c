//! Boundary fabric for broadcasting custom results to registered listeners.
//!
//! The matching engine itself never calls into this module; it is the sink
//! callers wire selection results (or any other custom payload) into so that
//! out-of-process tooling can observe them. Listeners register under a
//! declared result type and only receive payloads broadcast for that type.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::trace;

use crate::error::MatchError;

/// Listener for results of one declared type.
pub trait CustomEventListener: Send + Sync {
    /// Deliver a result of `result_type`. `payload` is opaque serialized
    /// bytes; see [`serialize_payload`].
    fn new_result(&self, result_type: &str, payload: &[u8]);
}

/// Fans results out to every listener registered for the matching declared
/// result type.
#[derive(Default)]
pub struct EventBroadcaster {
    listeners: RwLock<Vec<(String, Arc<dyn CustomEventListener>)>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for results declared as `result_type`.
    pub fn add_listener(
        &self,
        result_type: impl Into<String>,
        listener: Arc<dyn CustomEventListener>,
    ) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.push((result_type.into(), listener));
    }

    /// Remove every registration of `listener`, across all result types.
    pub fn remove_listener(&self, listener: &Arc<dyn CustomEventListener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.retain(|(_, registered)| !Arc::ptr_eq(registered, listener));
    }

    /// Broadcast `payload` to every listener registered for `result_type`.
    pub fn new_result(&self, result_type: &str, payload: &[u8]) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut delivered = 0usize;
        for (declared, listener) in listeners.iter() {
            if declared == result_type {
                listener.new_result(result_type, payload);
                delivered += 1;
            }
        }
        trace!(result_type, delivered, "event_broadcast");
    }
}

/// Serialize an event payload to opaque bytes for broadcasting.
pub fn serialize_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, MatchError> {
    Ok(serde_json::to_vec(value)?)
}
