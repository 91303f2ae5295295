//! Borrowed handle over an authenticated connection.

use super::{Connection, SessionId};
use crate::{error::ClientError, response::ExecResponse};

/// The active session of a [`Connection`].
///
/// A `Session` borrows its connection and therefore cannot outlive it. The
/// handle stays valid only while the session remains active; once it is
/// signed out or the connection closes, calls fail with
/// [`ClientError::InvalidState`].
#[derive(Debug, Clone, Copy)]
pub struct Session<'c> {
    connection: &'c Connection,
    id: SessionId,
}

impl<'c> Session<'c> {
    pub(super) const fn new(connection: &'c Connection, id: SessionId) -> Self {
        Self { connection, id }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId { self.id }

    /// Connection this session runs on.
    #[must_use]
    pub const fn connection(&self) -> &'c Connection { self.connection }

    /// Run `statement` in this session.
    ///
    /// # Errors
    /// See [`Connection::execute`].
    pub async fn execute(&self, statement: &str) -> Result<ExecResponse, ClientError> {
        self.connection.execute(self.id.get(), statement).await
    }

    /// Check that the session is still accepted by the server.
    ///
    /// # Errors
    /// See [`Connection::ping`].
    pub async fn ping(&self) -> Result<bool, ClientError> {
        self.connection.ping(self.id.get()).await
    }

    /// End this session.
    ///
    /// # Errors
    /// See [`Connection::signout`].
    pub async fn signout(self) -> Result<(), ClientError> {
        self.connection.signout(self.id.get()).await
    }
}
