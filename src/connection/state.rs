//! Connection lifecycle states and session identifiers.

use std::{fmt, num::NonZeroI64};

/// Server-issued session identifier. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(NonZeroI64);

impl SessionId {
    /// Wrap a raw id; `None` for zero.
    #[must_use]
    pub const fn new(raw: i64) -> Option<Self> {
        match NonZeroI64::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Raw id as sent on the wire.
    #[must_use]
    pub const fn get(self) -> i64 { self.0.get() }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<SessionId> for i64 {
    fn from(id: SessionId) -> Self { id.get() }
}

/// Lifecycle state of a [`Connection`](super::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket is held.
    #[default]
    Disconnected,
    /// A socket is open and no session is active.
    Connected,
    /// A socket is open and carries the given session.
    Authenticated(SessionId),
    /// A transport failure occurred; only `close` is accepted.
    Broken,
}

impl ConnectionState {
    /// Whether a usable socket is held.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Connected | Self::Authenticated(_)) }

    /// Active session, if any.
    #[must_use]
    pub const fn session_id(self) -> Option<SessionId> {
        match self {
            Self::Authenticated(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
            Self::Authenticated(id) => write!(f, "authenticated as session {id}"),
            Self::Broken => f.write_str("broken"),
        }
    }
}
