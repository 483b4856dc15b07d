//! Persistence tier selection.
//!
//! Guests persist to local storage; authenticated users persist to the
//! backend. The choice is a pure function of the [`Identity`] and is made
//! fresh for every operation, since a user may sign in mid-session. Stores
//! implement their persistence traits once per tier instead of branching at
//! every call site.

use std::sync::Arc;

use secrecy::SecretString;

use crate::api::StoreApi;
use crate::session::Identity;
use crate::storage::Storage;

/// Local storage tier.
///
/// Unpartitioned: only guests write through it.
#[derive(Debug, Clone)]
pub struct LocalTier {
    pub(crate) storage: Storage,
}

/// Backend tier for one bearer token.
pub struct RemoteTier<A> {
    pub(crate) api: Arc<A>,
    pub(crate) token: SecretString,
}

impl<A> Clone for RemoteTier<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            token: self.token.clone(),
        }
    }
}

/// The tier an operation runs against.
pub enum Tier<A> {
    Local(LocalTier),
    Remote(RemoteTier<A>),
}

impl<A: StoreApi> Tier<A> {
    /// Pick the tier for `identity`: remote when a session token is present.
    #[must_use]
    pub fn select(identity: &Identity, storage: &Storage, api: &Arc<A>) -> Self {
        match identity.token() {
            Some(token) => Self::Remote(RemoteTier {
                api: Arc::clone(api),
                token: token.clone(),
            }),
            None => Self::Local(LocalTier {
                storage: storage.clone(),
            }),
        }
    }
}
