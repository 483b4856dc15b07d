//! Session identity.
//!
//! The signed-in identity is an explicit value, [`Identity`], passed into
//! every store operation. Nothing reads "the current user" from ambient
//! state. Identity switches go through [`SessionStore`]:
//!
//! - [`SessionStore::sign_in`] / [`SessionStore::sign_out`] - explicit switches
//! - [`SessionStore::expire`] - forced teardown after the backend rejects the
//!   token (HTTP 401); status becomes [`SessionStatus::Expired`] so the UI
//!   can route to its login surface. A rejection that arrives after the
//!   session has already switched to another token is ignored.
//!
//! Status changes are published on a `tokio::sync::watch` channel.

use std::sync::{Mutex, PoisonError};

use secrecy::SecretString;
use tokio::sync::watch;

use pizzeria_core::UserId;

use crate::models::CurrentUser;
use crate::storage::{Namespace, OwnerKey, Storage, Store};

/// Owner partition for per-user local data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Unauthenticated session.
    Guest,
    /// Signed-in user.
    User(UserId),
}

impl OwnerKey for Owner {
    fn suffix(&self) -> Option<String> {
        Some(match self {
            Self::Guest => "guest".to_string(),
            Self::User(id) => id.to_string(),
        })
    }
}

/// Who is performing an operation.
///
/// Cheap to clone. A token is present exactly when a user is.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    auth: Option<(SecretString, CurrentUser)>,
}

impl Identity {
    /// An unauthenticated identity.
    #[must_use]
    pub const fn guest() -> Self {
        Self { auth: None }
    }

    /// A signed-in identity.
    #[must_use]
    pub fn authenticated(token: SecretString, user: CurrentUser) -> Self {
        Self {
            auth: Some((token, user)),
        }
    }

    /// Bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<&SecretString> {
        self.auth.as_ref().map(|(token, _)| token)
    }

    /// Signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&CurrentUser> {
        self.auth.as_ref().map(|(_, user)| user)
    }

    /// Whether a session token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Whether the signed-in user may use the admin ledger.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(|user| user.is_admin)
    }

    /// Storage partition for this identity.
    #[must_use]
    pub fn owner(&self) -> Owner {
        self.user().map_or(Owner::Guest, |user| Owner::User(user.id))
    }

    /// Reviewer id recorded on ratings.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|user| user.id)
    }
}

/// Published session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No one is signed in.
    Guest,
    /// A user is signed in.
    Authenticated(UserId),
    /// The backend rejected the token; the UI should show its login surface.
    Expired,
}

/// Owns the persisted session (`token` and `user` storage keys).
pub struct SessionStore {
    token: Store<(), String>,
    user: Store<(), CurrentUser>,
    current: Mutex<Identity>,
    status: watch::Sender<SessionStatus>,
}

impl SessionStore {
    /// Restore the session persisted in `storage`.
    ///
    /// A token without a user (or the reverse) is treated as corrupt and
    /// cleared, leaving a guest session.
    #[must_use]
    pub fn restore(storage: &Storage) -> Self {
        let token: Store<(), String> = Store::new(storage.clone(), Namespace::Token);
        let user: Store<(), CurrentUser> = Store::new(storage.clone(), Namespace::User);

        let identity = match (token.load(&()), user.load(&())) {
            (Some(raw), Some(profile)) => Identity::authenticated(SecretString::from(raw), profile),
            (None, None) => Identity::guest(),
            _ => {
                tracing::warn!("Discarding half-persisted session");
                token.clear(&());
                user.clear(&());
                Identity::guest()
            }
        };

        let (status, _) = watch::channel(status_of(&identity));

        Self {
            token,
            user,
            current: Mutex::new(identity),
            status,
        }
    }

    /// Current identity. Read fresh for every operation.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Persist and switch to a signed-in identity.
    pub fn sign_in(&self, token: SecretString, user: CurrentUser) -> Identity {
        use secrecy::ExposeSecret;

        self.token.save(&(), &token.expose_secret().to_string());
        self.user.save(&(), &user);

        let identity = Identity::authenticated(token, user);
        self.replace(identity.clone(), status_of(&identity));
        tracing::info!(user_id = ?identity.user_id(), "Signed in");
        identity
    }

    /// Clear the persisted session and switch to a guest identity.
    pub fn sign_out(&self) -> Identity {
        self.clear_persisted();
        self.replace(Identity::guest(), SessionStatus::Guest);
        tracing::info!("Signed out");
        Identity::guest()
    }

    /// Forced teardown after the backend rejected `rejected`.
    ///
    /// Only tears down the session still holding that token. Returns whether
    /// the session was expired.
    pub fn expire(&self, rejected: &SecretString) -> bool {
        use secrecy::ExposeSecret;

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let still_current = current
            .token()
            .is_some_and(|token| token.expose_secret() == rejected.expose_secret());
        if !still_current {
            tracing::debug!("Ignoring rejection of a superseded session token");
            return false;
        }

        self.clear_persisted();
        *current = Identity::guest();
        self.status.send_replace(SessionStatus::Expired);
        drop(current);

        tracing::warn!("Session rejected by backend, signed out");
        true
    }

    fn clear_persisted(&self) {
        self.token.clear(&());
        self.user.clear(&());
    }

    fn replace(&self, identity: Identity, status: SessionStatus) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = identity;
        self.status.send_replace(status);
    }
}

fn status_of(identity: &Identity) -> SessionStatus {
    identity
        .user_id()
        .map_or(SessionStatus::Guest, SessionStatus::Authenticated)
}
