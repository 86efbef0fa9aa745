//! Ordered session registry.

use crate::error::{Error, Result};
use crate::session::Session;

/// All registered sessions, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session after the ones already registered.
    ///
    /// # Errors
    /// Returns `Error::DuplicateSession` if the name is taken.
    pub fn register(&mut self, session: Session) -> Result<()> {
        if self.get(session.name()).is_some() {
            return Err(Error::DuplicateSession(session.name().to_owned()));
        }
        tracing::debug!("Registered session {}", session.name());
        self.sessions.push(session);
        Ok(())
    }

    /// Looks up a session by name.
    pub fn get(&self, name: &str) -> Option<&Session> {
        self.sessions.iter().find(|session| session.name() == name)
    }

    /// Every session, in registration order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    /// Sessions run when none are named, in registration order.
    pub fn defaults(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(|session| session.is_default())
    }

    /// Resolves an explicit selection, or the defaults when `names` is empty.
    ///
    /// Named sessions keep the order they were given in.
    ///
    /// # Errors
    /// Returns `Error::UnknownSession` for the first name that is not registered.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Session>> {
        if names.is_empty() {
            return Ok(self.defaults().collect());
        }
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .ok_or_else(|| Error::UnknownSession(name.to_owned()))
            })
            .collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
