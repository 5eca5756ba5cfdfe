//! Subscription registry for host messages.
//!
//! Every consumer registers under its owner id and holds a [`Subscription`]
//! guard. Dropping the guard deregisters exactly that subscriber, so several
//! consumers of the same channel never overwrite one another and cleanup also
//! happens on early returns.

use super::message::HostMessage;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;

type Handler = Arc<Mutex<dyn FnMut(&HostMessage) + Send>>;

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<BTreeMap<u64, Handler>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, id: u64) -> bool {
        self.subscribers
            .lock()
            .expect("message bus lock poisoned")
            .remove(&id)
            .is_some()
    }
}

#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, owner: impl Into<String>, handler: F) -> Subscription
    where
        F: FnMut(&HostMessage) + Send + 'static,
    {
        let owner = owner.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .expect("message bus lock poisoned")
            .insert(id, Arc::new(Mutex::new(handler)));
        tracing::trace!(owner = %owner, subscription = id, "message subscriber attached");

        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
            owner,
        }
    }

    /// Subscribes and forwards every parsed message into a channel.
    pub fn subscribe_channel(
        &self,
        owner: impl Into<String>,
    ) -> (Subscription, mpsc::UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(owner, move |message| {
            let _ = tx.send(message.clone());
        });
        (subscription, rx)
    }

    /// Delivers a raw posted message to every live subscriber and returns how
    /// many received it. Unrecognised messages reach nobody.
    pub fn dispatch(&self, raw: &Value) -> usize {
        let Some(message) = HostMessage::parse(raw) else {
            tracing::trace!("ignoring unrecognised host message");
            return 0;
        };

        let handlers: Vec<Handler> = self
            .inner
            .subscribers
            .lock()
            .expect("message bus lock poisoned")
            .values()
            .cloned()
            .collect();

        for handler in &handlers {
            let mut handler = handler.lock().expect("message handler lock poisoned");
            (*handler)(&message);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("message bus lock poisoned")
            .len()
    }
}

/// Registration guard; deregisters on drop.
#[must_use = "dropping a subscription deregisters it immediately"]
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
    owner: String,
}

impl Subscription {
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove(self.id) {
                tracing::trace!(owner = %self.owner, subscription = self.id, "message subscriber detached");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .finish()
    }
}
