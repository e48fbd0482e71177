//! Identity provider seam.
//!
//! Everything the dashboard stores is scoped to the signed-in account's
//! `uid`. The provider is injected, so a hosted sign-in flow can replace
//! [`LocalIdentityProvider`] without touching the rest of the crate.

use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{FeedHub, Subscription};

const SESSION_TOPIC: &str = "session";

/// Auth errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    #[error("Not signed in")]
    NotSignedIn,
}

pub type AuthResult<T> = Result<T, AuthError>;

/// The signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// Callback for session changes. `None` means signed out.
pub type IdentityCallback = Box<dyn Fn(&Option<Identity>) + Send + Sync>;

/// Sign-in capability.
pub trait IdentityProvider: Send + Sync {
    /// Start a session and return the signed-in account.
    fn sign_in(&self) -> AuthResult<Identity>;

    /// End the current session. Signing out twice is not an error.
    fn sign_out(&self) -> AuthResult<()>;

    /// The current account, if signed in.
    fn current(&self) -> Option<Identity>;

    /// Observe session changes. The current state is delivered immediately.
    fn subscribe(&self, callback: IdentityCallback) -> Subscription;
}

/// Session state and the number of changes made to it.
#[derive(Default)]
struct Session {
    revision: u64,
    identity: Option<Identity>,
}

/// Provider that signs in a fixed, locally configured account.
pub struct LocalIdentityProvider {
    account: Option<Identity>,
    session: Mutex<Session>,
    hub: FeedHub<Option<Identity>>,
}

impl LocalIdentityProvider {
    pub fn new(account: Identity) -> Self {
        Self {
            account: Some(account),
            session: Mutex::new(Session::default()),
            hub: FeedHub::new(),
        }
    }

    /// A provider with no account. Every sign-in fails.
    pub fn unconfigured() -> Self {
        Self {
            account: None,
            session: Mutex::new(Session::default()),
            hub: FeedHub::new(),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_session(&self, identity: Option<Identity>) {
        let (revision, snapshot) = {
            let mut session = self.session();
            session.revision += 1;
            session.identity = identity;
            (session.revision, session.identity.clone())
        };
        self.hub.publish(SESSION_TOPIC, revision, snapshot);
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_in(&self) -> AuthResult<Identity> {
        let identity = self.account.clone().ok_or_else(|| {
            tracing::error!("sign-in attempted without a configured account");
            AuthError::SignInFailed("no account configured".into())
        })?;

        tracing::info!(uid = %identity.uid, "signed in");
        self.set_session(Some(identity.clone()));
        Ok(identity)
    }

    fn sign_out(&self) -> AuthResult<()> {
        if let Some(identity) = self.current() {
            tracing::info!(uid = %identity.uid, "signed out");
        }
        self.set_session(None);
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.session().identity.clone()
    }

    fn subscribe(&self, callback: IdentityCallback) -> Subscription {
        let subscribed = self.hub.subscribe_with(
            SESSION_TOPIC,
            move |identity: &Option<Identity>| callback(identity),
            || {
                let session = self.session();
                Ok::<_, Infallible>((session.revision, session.identity.clone()))
            },
        );
        match subscribed {
            Ok(subscription) => subscription,
            Err(never) => match never {},
        }
    }
}
