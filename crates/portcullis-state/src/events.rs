//! Named event surface.
//!
//! Callers subscribe to string-named events and receive a JSON payload.
//! Handlers registered with [`EventBus::once`] are removed before they run,
//! so they fire at most once even when an emit re-enters the bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

/// Emitted when an actor id appears where there was none.
pub const USER_LOGIN: &str = "user:login";

/// Emitted when the actor id is cleared.
pub const USER_LOGOUT: &str = "user:logout";

/// Emitted when one actor id is replaced by another.
pub const USER_LOGIN_CHANGE: &str = "user:login:change";

/// Handle for removing a single handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Registered {
    id: HandlerId,
    handler: Handler,
    once: bool,
}

/// Subscribe/unsubscribe/emit over caller-defined event names.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<Registered>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, event: &str, handler: Handler, once: bool) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push(Registered { id, handler, once });
        id
    }

    /// Run `handler` on every emit of `event`.
    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.add(event, Arc::new(handler), false)
    }

    /// Run `handler` on the next emit of `event` only.
    pub fn once<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.add(event, Arc::new(handler), true)
    }

    /// Remove one handler, or every handler of `event` when `id` is `None`.
    ///
    /// Returns the number of handlers removed.
    pub fn off(&self, event: &str, id: Option<HandlerId>) -> usize {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        match id {
            None => handlers.remove(event).map_or(0, |list| list.len()),
            Some(id) => {
                let Some(list) = handlers.get_mut(event) else {
                    return 0;
                };
                let before = list.len();
                list.retain(|r| r.id != id);
                let removed = before - list.len();
                if list.is_empty() {
                    handlers.remove(event);
                }
                removed
            }
        }
    }

    /// Remove every handler of every event.
    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Call the handlers of `event` in registration order.
    ///
    /// Returns the number of handlers called.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let to_call: Vec<Handler> = {
            let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
            let Some(list) = handlers.get_mut(event) else {
                return 0;
            };
            let calls = list.iter().map(|r| Arc::clone(&r.handler)).collect();
            list.retain(|r| !r.once);
            if list.is_empty() {
                handlers.remove(event);
            }
            calls
        };

        tracing::trace!(event, handlers = to_call.len(), "emitting event");
        for handler in &to_call {
            handler(payload);
        }
        to_call.len()
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut events: Vec<_> = handlers.keys().collect();
        events.sort();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}
