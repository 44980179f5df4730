//! In-memory storage implementation for Tally.
//!
//! This crate implements the collaborator traits defined in `tally-core`
//! against plain in-process tables:
//! - [`MemoryStore`]: balance and snapshot queries plus a table change feed
//! - [`StaticIdentity`]: a settable identity with a demo-mode switch
//!
//! Real and demo data live in separate tables. Transaction writes update the
//! affected balance asynchronously, the way a backend recomputes balances
//! after a write, so consumers see a transaction change first and the
//! balance change later.
//!
//! ```text
//!   writes ──► tables ──► change feed ──► tally-core hub
//!                 │
//!                 └──────► queries ◄────── coordinator / history
//! ```

pub mod feed;
pub mod identity;
pub mod model;
pub mod store;

pub use feed::FeedRegistry;
pub use identity::StaticIdentity;
pub use model::{NewTransaction, Transaction};
pub use store::MemoryStore;

// Re-export from tally-core for convenience
pub use tally_core::errors::{DataError, Error, Result};
