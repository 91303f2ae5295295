//! Typed RPC requests and replies.
//!
//! These types mirror the server schema one-to-one:
//!
//! - `authenticate(username, password) -> {error_code, session_id, error_msg?}`
//! - `execute(session_id, statement) -> {error_code, error_msg?, latency_us,
//!   space_name?, column_name*, row*}`
//! - `signout(session_id)`, one-way
//!
//! Conversions in both directions are provided so the same schema serves the
//! client and test servers.

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use super::{
    FieldId,
    Frame,
    FrameError,
    Method,
    encode_params,
    params::Params,
    value::{Row, decode_row, encode_row},
};

/// A request sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Exchange credentials for a session.
    Authenticate {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// Run a statement within a session.
    Execute {
        /// Session the statement runs in.
        session_id: i64,
        /// Query text.
        statement: String,
    },
    /// Release a session.
    Signout {
        /// Session to release.
        session_id: i64,
    },
}

impl Request {
    /// Method this request invokes.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Authenticate { .. } => Method::Authenticate,
            Self::Execute { .. } => Method::Execute,
            Self::Signout { .. } => Method::Signout,
        }
    }

    /// Encode the request as a frame carrying sequence number `seq`.
    ///
    /// # Errors
    /// Returns an error if the body exceeds protocol limits.
    pub fn to_frame(&self, seq: u32) -> Result<Frame, FrameError> {
        let body = match self {
            Self::Authenticate { username, password } => encode_params(&[
                (FieldId::Username, username.as_bytes()),
                (FieldId::Password, password.as_bytes()),
            ])?,
            Self::Execute {
                session_id,
                statement,
            } => encode_params(&[
                (FieldId::SessionId, session_id.to_be_bytes().as_slice()),
                (FieldId::Statement, statement.as_bytes()),
            ])?,
            Self::Signout { session_id } => {
                encode_params(&[(FieldId::SessionId, session_id.to_be_bytes())])?
            }
        };
        Frame::request(self.method(), seq, body)
    }

    /// Decode a request frame.
    ///
    /// # Errors
    /// Returns an error if the frame is a reply, names an unknown method, or
    /// lacks required fields.
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        if frame.header.is_reply() {
            return Err(FrameError::UnexpectedDirection);
        }
        let params = Params::parse(&frame.body)?;
        match frame.header.method()? {
            Method::Authenticate => Ok(Self::Authenticate {
                username: params.required_string(FieldId::Username)?,
                password: params.required_string(FieldId::Password)?,
            }),
            Method::Execute => Ok(Self::Execute {
                session_id: params.required_i64(FieldId::SessionId)?,
                statement: params.required_string(FieldId::Statement)?,
            }),
            Method::Signout => Ok(Self::Signout {
                session_id: params.required_i64(FieldId::SessionId)?,
            }),
        }
    }
}

/// Check that `frame` answers the request `(method, seq)`.
fn check_reply(frame: &Frame, method: Method, seq: u32) -> Result<Params, FrameError> {
    if !frame.header.is_reply() {
        return Err(FrameError::UnexpectedDirection);
    }
    let actual = frame.header.method()?;
    if actual != method {
        return Err(FrameError::MethodMismatch {
            expected: method,
            actual,
        });
    }
    if frame.header.seq != seq {
        return Err(FrameError::SequenceMismatch {
            expected: seq,
            received: frame.header.seq,
        });
    }
    Params::parse(&frame.body)
}

/// Decoded reply to `authenticate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthReply {
    /// Application-level result code (0 = success).
    pub error_code: i32,
    /// Issued session id; 0 when authentication failed.
    pub session_id: i64,
    /// Optional failure description.
    pub error_msg: Option<String>,
}

impl AuthReply {
    /// Decode the reply to the authenticate request `seq`.
    ///
    /// A missing session id decodes as 0.
    ///
    /// # Errors
    /// Returns an error if the frame does not answer `seq` or is malformed.
    pub fn from_frame(frame: &Frame, seq: u32) -> Result<Self, FrameError> {
        let params = check_reply(frame, Method::Authenticate, seq)?;
        let session_id = match params.required_i64(FieldId::SessionId) {
            Err(FrameError::MissingField(_)) => 0,
            other => other?,
        };
        Ok(Self {
            error_code: params.required_i32(FieldId::ErrorCode)?,
            session_id,
            error_msg: params.string(FieldId::ErrorMsg)?,
        })
    }

    /// Encode the reply for request `seq`.
    ///
    /// # Errors
    /// Returns an error if the body exceeds protocol limits.
    pub fn to_frame(&self, seq: u32) -> Result<Frame, FrameError> {
        let mut params: Vec<(FieldId, Vec<u8>)> = vec![
            (FieldId::ErrorCode, self.error_code.to_be_bytes().to_vec()),
            (FieldId::SessionId, self.session_id.to_be_bytes().to_vec()),
        ];
        if let Some(msg) = &self.error_msg {
            params.push((FieldId::ErrorMsg, msg.as_bytes().to_vec()));
        }
        Frame::reply(Method::Authenticate, seq, encode_params(&params)?)
    }
}

/// Decoded reply to `execute`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecReply {
    /// Application-level result code (0 = success).
    pub error_code: i32,
    /// Optional failure description.
    pub error_msg: Option<String>,
    /// Server-side execution latency in microseconds.
    pub latency_us: u64,
    /// Graph space the statement ran against.
    pub space_name: Option<String>,
    /// Result-set column names in order.
    pub column_names: Vec<String>,
    /// Result-set rows in order.
    pub rows: Vec<Row>,
}

impl ExecReply {
    /// Decode the reply to the execute request `seq`.
    ///
    /// # Errors
    /// Returns an error if the frame does not answer `seq` or is malformed.
    pub fn from_frame(frame: &Frame, seq: u32) -> Result<Self, FrameError> {
        let params = check_reply(frame, Method::Execute, seq)?;
        let column_names = params
            .all(FieldId::ColumnName)
            .iter()
            .map(|raw| {
                String::from_utf8(raw.clone())
                    .map_err(|_| FrameError::InvalidParamValue(FieldId::ColumnName))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rows = params
            .all(FieldId::Row)
            .iter()
            .map(|raw| decode_row(raw.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            error_code: params.required_i32(FieldId::ErrorCode)?,
            error_msg: params.string(FieldId::ErrorMsg)?,
            latency_us: params.u64(FieldId::LatencyUs)?.unwrap_or_default(),
            space_name: params.string(FieldId::SpaceName)?,
            column_names,
            rows,
        })
    }

    /// Encode the reply for request `seq`.
    ///
    /// # Errors
    /// Returns an error if a row cannot be encoded or the body exceeds
    /// protocol limits.
    pub fn to_frame(&self, seq: u32) -> Result<Frame, FrameError> {
        let mut params: Vec<(FieldId, Vec<u8>)> = vec![
            (FieldId::ErrorCode, self.error_code.to_be_bytes().to_vec()),
            (FieldId::LatencyUs, self.latency_us.to_be_bytes().to_vec()),
        ];
        if let Some(msg) = &self.error_msg {
            params.push((FieldId::ErrorMsg, msg.as_bytes().to_vec()));
        }
        if let Some(space) = &self.space_name {
            params.push((FieldId::SpaceName, space.as_bytes().to_vec()));
        }
        for name in &self.column_names {
            params.push((FieldId::ColumnName, name.as_bytes().to_vec()));
        }
        for row in &self.rows {
            params.push((FieldId::Row, encode_row(row)?));
        }
        Frame::reply(Method::Execute, seq, encode_params(&params)?)
    }
}
