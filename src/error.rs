//! Failures surfaced by the session client.
//!
//! Application-level failures (a non-zero error code from the server) are not
//! errors here; they travel inside [`AuthResponse`](crate::AuthResponse) and
//! [`ExecResponse`](crate::ExecResponse).

use std::{io, time::Duration};

use thiserror::Error;

use crate::{
    connection::{ConnectionState, SessionId},
    protocol::FrameError,
};

/// Errors returned by [`Connection`](crate::Connection) and
/// [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The peer did not accept the connection before the deadline.
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Target address.
        addr: String,
        /// Configured connect timeout.
        timeout: Duration,
    },
    /// The peer actively refused the connection.
    #[error("connection to {addr} refused")]
    ConnectionRefused {
        /// Target address.
        addr: String,
    },
    /// The address could not be resolved or reached.
    #[error("host {addr} is unreachable: {source}")]
    UnreachableHost {
        /// Target address.
        addr: String,
        /// Underlying OS error.
        source: io::Error,
    },
    /// Reading or writing a frame failed, or the peer closed the socket.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
    /// No complete frame arrived within the idle timeout.
    #[error("no reply within {0:?}")]
    ReadTimeout(Duration),
    /// The operation is not valid in the current connection state.
    #[error("{operation} is not valid while {actual}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the connection was in.
        actual: ConnectionState,
    },
    /// The supplied session id is not the active session.
    #[error("session {given} is not the active session {active}")]
    InvalidSession {
        /// Session id passed by the caller.
        given: i64,
        /// Session id held by the connection.
        active: SessionId,
    },
    /// Another call on this connection is still awaiting its reply.
    #[error("another call is in progress on this connection")]
    CallInProgress,
    /// A frame could not be encoded or a reply could not be decoded.
    #[error("malformed frame: {0}")]
    Decode(#[source] FrameError),
}

impl ClientError {
    /// Whether the failure broke the underlying transport.
    ///
    /// A connection that returned a transport error must be closed and
    /// reopened before further use.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::ConnectionRefused { .. }
                | Self::UnreachableHost { .. }
                | Self::Io(_)
                | Self::ReadTimeout(_)
        )
    }

    /// Whether a reply arrived out of step with its request.
    ///
    /// The connection is broken afterwards, as for transport errors.
    #[must_use]
    pub const fn is_out_of_sync(&self) -> bool {
        matches!(self, Self::Decode(e) if e.breaks_pairing())
    }

    /// Whether the failure was a local precondition violation.
    ///
    /// Misuse errors are raised before anything is sent to the server.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::InvalidSession { .. } | Self::CallInProgress
        )
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => Self::Io(e),
            other => Self::Decode(other),
        }
    }
}
