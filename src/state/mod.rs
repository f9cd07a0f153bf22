//! Application state stores.
//!
//! The view state and the theme live in independent stores, each persisting
//! to its own durable storage key. Both apply updates through the deep merge
//! in [`merge`] or by direct replacement, and broadcast every change.

mod merge;
mod store;
mod theme;

pub use merge::deep_merge;
pub use store::{ComputePatch, Update, ViewStateStore, VIEW_STATE_KEY};
pub use theme::{ThemeStore, THEME_KEY};
