//! Change notification module.
//!
//! Collaborator channels (table change feeds, an in-process event bus and a
//! platform emitter) are wrapped as [`ChangeSource`]s. The
//! [`ChangeNotificationHub`] subscribes to all of them and forwards every
//! notification as a single kind of "something may have changed" signal.

mod change_event;
mod channels;
mod hub;
mod local_channel;
mod sources;

pub use change_event::*;
pub use channels::*;
pub use hub::{ChangeNotificationHub, HubSubscription};
pub use local_channel::LocalEventChannel;
pub use sources::*;
