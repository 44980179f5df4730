//! Settable identity provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tally_core::errors::Result;
use tally_core::identity::{IdentityProviderTrait, UserIdentity};

/// Identity whose user and demo flag are set by the embedder.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<UserIdentity>>,
    demo: AtomicBool,
}

impl StaticIdentity {
    pub fn signed_in(user: UserIdentity) -> Self {
        Self {
            user: RwLock::new(Some(user)),
            demo: AtomicBool::new(false),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: UserIdentity) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn set_demo_mode(&self, demo: bool) {
        self.demo.store(demo, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProviderTrait for StaticIdentity {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        Ok(self.user.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn is_demo_mode(&self) -> bool {
        self.demo.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let identity = StaticIdentity::signed_out();
        assert!(identity.current_user().await.unwrap().is_none());

        identity.sign_in(UserIdentity::new("user-1"));
        assert_eq!(
            identity.current_user().await.unwrap().map(|u| u.id),
            Some("user-1".to_string())
        );

        identity.sign_out();
        assert!(identity.current_user().await.unwrap().is_none());
    }

    #[test]
    fn test_demo_flag() {
        let identity = StaticIdentity::signed_in(UserIdentity::new("user-1"));
        assert!(!identity.is_demo_mode());
        identity.set_demo_mode(true);
        assert!(identity.is_demo_mode());
    }
}
