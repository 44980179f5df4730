//! Refresh module - debounced, single-flight reloading of the balance cache.

mod debounce;
mod refresh_coordinator;
mod refresh_model;

pub use debounce::DebounceTimer;
pub use refresh_coordinator::RefreshCoordinator;
pub use refresh_model::{RefreshPhase, RefreshState};
