//! Subscriptions to store changes.
//!
//! Both stores broadcast into a shared [`SubscriptionManager`]:
//! - View state snapshots, tagged with the fields that changed
//! - Theme changes
//!
//! Subscriptions support:
//! - Filtering by event kind and by view state field
//! - Optional delivery of the current value on subscribe
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::fields(vec![ViewField::Satellite]),
//!     ..Default::default()
//! });
//!
//! store.update(ViewStatePatch::satellite(true))?;
//!
//! for event in handle.drain() {
//!     if let ViewerEvent::ViewState { state, .. } = event {
//!         println!("satellite now {}", state.satellite_enabled);
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId,
    ViewerEvent,
};
