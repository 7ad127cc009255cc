//! Client-scoped persistence for the login session.

use super::session::{PersistedSession, Session};
use crate::error::Result;

pub trait SessionStore {
    /// The raw persisted fields, if anything was ever stored.
    fn get(&self) -> Option<PersistedSession>;

    fn set(&mut self, session: &Session) -> Result<()>;

    /// Empties the persisted fields.
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store. Lives as long as the value does.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    fields: Option<PersistedSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `fields`, as if written by an earlier run.
    pub fn with_fields(fields: PersistedSession) -> Self {
        Self {
            fields: Some(fields),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<PersistedSession> {
        self.fields.clone()
    }

    fn set(&mut self, session: &Session) -> Result<()> {
        self.fields = Some(PersistedSession::from(session));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.fields = Some(PersistedSession::cleared());
        Ok(())
    }
}
