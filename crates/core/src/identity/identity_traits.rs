//! Identity collaborator trait.

use async_trait::async_trait;

use super::UserIdentity;
use crate::errors::Result;

/// Source of the current identity and of the demo-mode switch.
#[async_trait]
pub trait IdentityProviderTrait: Send + Sync {
    /// Resolves the signed-in user. `Ok(None)` means nobody is signed in.
    async fn current_user(&self) -> Result<Option<UserIdentity>>;

    /// When true, every query targets the demo dataset.
    fn is_demo_mode(&self) -> bool;
}
