//! Identity module - the signed-in user and demo-mode signals consumed by the engine.

mod identity_model;
mod identity_traits;

pub use identity_model::UserIdentity;
pub use identity_traits::IdentityProviderTrait;
