//! Subscription manager for broadcasting store changes.

use crate::types::{ThemeState, ViewField, ViewState};
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    DropReason, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId,
    ViewerEvent,
};

/// Internal subscription state.
struct Subscription {
    filter: SubscriptionFilter,
    sender: Sender<ViewerEvent>,
    /// Events allowed in flight. The channel holds one more slot, kept free
    /// for the overflow notice.
    buffer_size: usize,
}

impl Subscription {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    fn try_send(&self, event: ViewerEvent) -> bool {
        if self.sender.len() >= self.buffer_size {
            return false;
        }
        self.sender.try_send(event).is_ok()
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// `include_current` is ignored here; the stores handle it because only
    /// they know the current value.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let buffer_size = config.buffer_size.max(1);
        let (sender, receiver) = bounded(buffer_size + 1);

        self.subscriptions.write().insert(
            id,
            Subscription {
                filter: config.filter,
                sender,
                buffer_size,
            },
        );

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(ViewerEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    /// Broadcast a view state snapshot to subscriptions interested in `changed`.
    pub fn broadcast_view_state(&self, state: Arc<ViewState>, changed: Vec<ViewField>) {
        let filter_changed = changed.clone();
        let event = ViewerEvent::ViewState { state, changed };

        self.broadcast(|sub| sub.filter.matches_view_state(&filter_changed), event);
    }

    /// Broadcast a theme change.
    pub fn broadcast_theme(&self, theme: ThemeState) {
        let event = ViewerEvent::Theme { theme };

        self.broadcast(|sub| sub.filter.include_theme, event);
    }

    /// Send an event directly to one subscription.
    /// Returns false if the subscription was dropped.
    pub fn send_to(&self, id: SubscriptionId, event: ViewerEvent) -> bool {
        let subs = self.subscriptions.read();
        if let Some(sub) = subs.get(&id) {
            sub.try_send(event)
        } else {
            false
        }
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast<F>(&self, filter: F, event: ViewerEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if filter(sub) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::warn!(subscription = id.0, "dropping slow subscriber");
                    let _ = sub.sender.try_send(ViewerEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
