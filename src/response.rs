//! Caller-facing results of authenticate and execute calls.
//!
//! The mapping functions here are pure: they turn decoded replies into tagged
//! results so a server-side failure can never be mistaken for success. Only
//! malformed replies produce an error.

use std::{fmt, time::Duration};

use crate::{
    connection::SessionId,
    protocol::{AuthReply, ExecReply, FrameError, Row, Value},
};

/// Application-level result codes reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The call succeeded.
    Succeeded,
    /// The server lost its connection to a backend.
    Disconnected,
    /// The server failed to reach a backend.
    FailToConnect,
    /// An internal RPC failed.
    RpcFailure,
    /// The credentials were rejected.
    BadUsernamePassword,
    /// The session id is unknown to the server.
    SessionInvalid,
    /// The session expired on the server.
    SessionTimeout,
    /// The statement could not be parsed.
    SyntaxError,
    /// The statement failed while running.
    ExecutionError,
    /// The statement was empty.
    StatementEmpty,
    /// The account does not exist.
    UserNotFound,
    /// The account lacks the required privilege.
    BadPermission,
    /// The statement is well-formed but meaningless.
    SemanticError,
    /// The server reported an unknown failure.
    Unknown,
    /// A code this client does not know.
    Other(i32),
}

impl ErrorCode {
    /// Numeric wire value.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Disconnected => -1,
            Self::FailToConnect => -2,
            Self::RpcFailure => -3,
            Self::BadUsernamePassword => -4,
            Self::SessionInvalid => -5,
            Self::SessionTimeout => -6,
            Self::SyntaxError => -7,
            Self::ExecutionError => -8,
            Self::StatementEmpty => -9,
            Self::UserNotFound => -10,
            Self::BadPermission => -11,
            Self::SemanticError => -12,
            Self::Unknown => -13,
            Self::Other(code) => code,
        }
    }

    /// Whether the code denotes success.
    #[must_use]
    pub const fn is_success(self) -> bool { matches!(self, Self::Succeeded) }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Succeeded,
            -1 => Self::Disconnected,
            -2 => Self::FailToConnect,
            -3 => Self::RpcFailure,
            -4 => Self::BadUsernamePassword,
            -5 => Self::SessionInvalid,
            -6 => Self::SessionTimeout,
            -7 => Self::SyntaxError,
            -8 => Self::ExecutionError,
            -9 => Self::StatementEmpty,
            -10 => Self::UserNotFound,
            -11 => Self::BadPermission,
            -12 => Self::SemanticError,
            -13 => Self::Unknown,
            other => Self::Other(other),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self { code.code() }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "error code {code}"),
            other => write!(f, "{other:?} ({})", other.code()),
        }
    }
}

/// A failure reported by the server in an otherwise well-formed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    /// Reported code; never [`ErrorCode::Succeeded`].
    pub code: ErrorCode,
    /// Optional human-readable description.
    pub message: Option<String>,
}

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for ServerFailure {}

/// Outcome of an authenticate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// The server issued a session.
    Authenticated(SessionId),
    /// The server refused the credentials.
    Rejected(ServerFailure),
}

impl AuthResponse {
    /// Result code reported by the server.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Authenticated(_) => ErrorCode::Succeeded,
            Self::Rejected(failure) => failure.code,
        }
    }

    /// Issued session, if authentication succeeded.
    #[must_use]
    pub const fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::Authenticated(id) => Some(*id),
            Self::Rejected(_) => None,
        }
    }
}

/// Tabular payload of a successful execute call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    column_names: Vec<String>,
    rows: Vec<Row>,
}

impl DataSet {
    /// Column names in result order; possibly empty.
    #[must_use]
    pub fn column_names(&self) -> &[String] { &self.column_names }

    /// Rows in result order; possibly empty.
    #[must_use]
    pub fn rows(&self) -> &[Row] { &self.rows }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize { self.rows.len() }

    /// Whether the result has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// Every value of the named column, top to bottom.
    #[must_use]
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + use<'a>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(idx)))
    }

    /// Split into column names and rows.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) { (self.column_names, self.rows) }
}

/// Success or failure of an execute call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// The statement ran; the data set may be empty.
    Succeeded(DataSet),
    /// The server reported a failure.
    Failed(ServerFailure),
}

/// Result of one execute call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResponse {
    outcome: ExecOutcome,
    latency_us: u64,
    space_name: Option<String>,
}

impl ExecResponse {
    /// Tagged outcome.
    #[must_use]
    pub const fn outcome(&self) -> &ExecOutcome { &self.outcome }

    /// Result code reported by the server.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match &self.outcome {
            ExecOutcome::Succeeded(_) => ErrorCode::Succeeded,
            ExecOutcome::Failed(failure) => failure.code,
        }
    }

    /// Whether the statement succeeded.
    #[must_use]
    pub const fn is_succeeded(&self) -> bool { matches!(self.outcome, ExecOutcome::Succeeded(_)) }

    /// Returned data, if the statement succeeded.
    #[must_use]
    pub const fn data(&self) -> Option<&DataSet> {
        match &self.outcome {
            ExecOutcome::Succeeded(data) => Some(data),
            ExecOutcome::Failed(_) => None,
        }
    }

    /// Server-side execution time in microseconds.
    #[must_use]
    pub const fn latency_us(&self) -> u64 { self.latency_us }

    /// Server-side execution time.
    #[must_use]
    pub const fn latency(&self) -> Duration { Duration::from_micros(self.latency_us) }

    /// Graph space the statement ran against, if reported.
    #[must_use]
    pub fn space_name(&self) -> Option<&str> { self.space_name.as_deref() }

    /// Convert into a standard [`Result`].
    ///
    /// # Errors
    /// Returns the [`ServerFailure`] when the statement failed.
    pub fn into_result(self) -> Result<DataSet, ServerFailure> {
        match self.outcome {
            ExecOutcome::Succeeded(data) => Ok(data),
            ExecOutcome::Failed(failure) => Err(failure),
        }
    }
}

/// Map a decoded authenticate reply.
///
/// # Errors
/// Returns [`FrameError::ZeroSession`] when the server reports success
/// without issuing a session.
pub fn map_auth_reply(reply: AuthReply) -> Result<AuthResponse, FrameError> {
    let code = ErrorCode::from(reply.error_code);
    if !code.is_success() {
        return Ok(AuthResponse::Rejected(ServerFailure {
            code,
            message: reply.error_msg,
        }));
    }
    SessionId::new(reply.session_id)
        .map(AuthResponse::Authenticated)
        .ok_or(FrameError::ZeroSession)
}

/// Map a decoded execute reply. Payload attached to a failure is dropped.
///
/// # Errors
/// Returns [`FrameError::RaggedRow`] when a successful reply carries a row
/// whose width differs from the number of columns.
pub fn map_exec_reply(reply: ExecReply) -> Result<ExecResponse, FrameError> {
    let code = ErrorCode::from(reply.error_code);
    let outcome = if code.is_success() {
        let columns = reply.column_names.len();
        if let Some((row, cells)) = reply
            .rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns)
        {
            return Err(FrameError::RaggedRow {
                row,
                width: cells.len(),
                columns,
            });
        }
        ExecOutcome::Succeeded(DataSet {
            column_names: reply.column_names,
            rows: reply.rows,
        })
    } else {
        ExecOutcome::Failed(ServerFailure {
            code,
            message: reply.error_msg,
        })
    };
    Ok(ExecResponse {
        outcome,
        latency_us: reply.latency_us,
        space_name: reply.space_name,
    })
}
