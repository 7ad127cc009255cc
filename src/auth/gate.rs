use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::credentials::CredentialStore;
use super::session::Session;
use super::store::SessionStore;
use crate::error::{AppError, Result};

/// The in-process "already authenticated this run" flag, owned by the caller.
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    username: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

/// Gate in front of every protected operation.
///
/// States are `Anonymous` and `Authenticated`, tracked by the caller's
/// [`SessionContext`] plus whatever the [`SessionStore`] persisted. Expiry is
/// checked lazily on `authorize` and is never reported as an error.
pub struct SessionGate {
    credentials: Arc<dyn CredentialStore>,
    ttl: Duration,
}

impl SessionGate {
    pub fn new(credentials: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self { credentials, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn login(
        &self,
        ctx: &mut SessionContext,
        store: &mut dyn SessionStore,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::ParseError(
                "username and password are required".to_string(),
            ));
        }
        if !self.credentials.verify(username, password) {
            warn!("Login rejected for user: {}", username);
            return Err(AppError::InvalidCredentials);
        }

        let session = Session::mint(username, self.ttl, Utc::now())?;
        store.set(&session)?;
        ctx.username = Some(session.username.clone());

        info!("User {} logged in, session expires at {}", username, session.expires_at);
        Ok(session)
    }

    pub fn authorize(&self, ctx: &mut SessionContext, store: &dyn SessionStore) -> Access {
        self.authorize_at(ctx, store, Utc::now())
    }

    /// Same as [`authorize`](Self::authorize) against an explicit clock.
    pub fn authorize_at(
        &self,
        ctx: &mut SessionContext,
        store: &dyn SessionStore,
        now: DateTime<Utc>,
    ) -> Access {
        if ctx.is_authenticated() {
            return Access::Granted;
        }

        match store.get().and_then(|fields| fields.to_session()) {
            Some(session) if session.is_valid_at(now) => {
                debug!("Restored session for user {}", session.username);
                ctx.username = Some(session.username);
                Access::Granted
            }
            Some(session) => {
                debug!("Session for user {} expired at {}", session.username, session.expires_at);
                Access::Denied
            }
            None => Access::Denied,
        }
    }

    /// The persisted session, if still valid at `now`.
    pub fn current_session(&self, store: &dyn SessionStore, now: DateTime<Utc>) -> Option<Session> {
        store
            .get()
            .and_then(|fields| fields.to_session())
            .filter(|session| session.is_valid_at(now))
    }

    pub fn logout(&self, ctx: &mut SessionContext, store: &mut dyn SessionStore) -> Result<()> {
        if let Some(username) = ctx.username.take() {
            info!("User {} logged out", username);
        }
        store.clear()
    }
}
