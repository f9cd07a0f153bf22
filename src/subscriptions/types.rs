//! Subscription types for store change events.

use crate::types::{ThemeState, ViewField, ViewState};
use std::sync::Arc;

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 256
    pub buffer_size: usize,

    /// Deliver the store's current value as the first event.
    pub include_current: bool,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            include_current: false,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only view state changes touching one of these fields (None = any field).
    pub fields: Option<Vec<ViewField>>,

    /// Include view state events.
    pub include_view_state: bool,

    /// Include theme events.
    pub include_theme: bool,
}

impl SubscriptionFilter {
    /// Every view state change.
    pub fn view_state() -> Self {
        Self {
            include_view_state: true,
            ..Default::default()
        }
    }

    /// View state changes touching specific fields.
    pub fn fields(fields: Vec<ViewField>) -> Self {
        Self {
            fields: Some(fields),
            include_view_state: true,
            ..Default::default()
        }
    }

    /// Theme changes only.
    pub fn theme() -> Self {
        Self {
            include_theme: true,
            ..Default::default()
        }
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            include_view_state: true,
            include_theme: true,
            ..Default::default()
        }
    }

    pub(crate) fn matches_view_state(&self, changed: &[ViewField]) -> bool {
        if !self.include_view_state {
            return false;
        }
        match &self.fields {
            Some(fields) => changed.iter().any(|f| fields.contains(f)),
            None => true,
        }
    }
}

/// Events delivered to subscribers.
#[derive(Clone, Debug)]
pub enum ViewerEvent {
    /// A new view state snapshot was published.
    ViewState {
        state: Arc<ViewState>,
        /// Fields that differ from the previous snapshot.
        changed: Vec<ViewField>,
    },

    /// The theme changed.
    Theme { theme: ThemeState },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<ViewerEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ViewerEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ViewerEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ViewerEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take every event buffered so far without blocking.
    pub fn drain(&self) -> Vec<ViewerEvent> {
        self.receiver.try_iter().collect()
    }
}
