//! Named publish/subscribe dispatch.
//!
//! Handlers run synchronously inside `emit`, in the order they were
//! registered. Registering the same closure twice means it runs twice.

use std::collections::HashMap;

pub type Handler<T> = Box<dyn FnMut(&T) + Send>;

/// Token returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct EventBus<T> {
    handlers: HashMap<String, Vec<(SubscriptionId, Handler<T>)>>,
    next_id: u64,
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn on<F>(&mut self, event: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, Box::new(handler)));

        id
    }

    /// Removes one subscription. Returns false if it was not registered under `event`.
    pub fn off(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(handlers) = self.handlers.get_mut(event) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            self.handlers.remove(event);
        }

        removed
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn emit(&mut self, event: &str, data: &T) {
        if let Some(handlers) = self.handlers.get_mut(event) {
            for (_, handler) in handlers.iter_mut() {
                handler(data);
            }
        }
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
