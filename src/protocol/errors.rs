//! Error types for frame decoding and parameter parsing.

use thiserror::Error;
use tokio::io;

use super::{FieldId, Method};

/// Errors raised while encoding or decoding frames and their bodies.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Header flags carry bits outside the defined set.
    #[error("invalid flags {0:#04x}")]
    InvalidFlags(u8),
    /// Header announces a protocol version this client does not speak.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    /// Body size exceeds the configured maximum.
    #[error("payload too large")]
    PayloadTooLarge,
    /// Body length does not match the header or the parameter block.
    #[error("size mismatch")]
    SizeMismatch,
    /// A field identifier appears more than once when not allowed.
    #[error("duplicate field id {0}")]
    DuplicateField(u16),
    /// Buffer is too short to contain the expected data.
    #[error("buffer too short")]
    ShortBuffer,
    /// A required parameter field is missing.
    #[error("missing field {0}")]
    MissingField(FieldId),
    /// A parameter value could not be parsed (invalid UTF-8 or wrong width).
    #[error("invalid value for field {0}")]
    InvalidParamValue(FieldId),
    /// Header carries a method code with no known meaning.
    #[error("unknown method {0}")]
    UnknownMethod(u16),
    /// A reply answered a different method than the one requested.
    #[error("reply for {actual} does not answer {expected}")]
    MethodMismatch {
        /// Method of the outstanding request.
        expected: Method,
        /// Method named by the reply.
        actual: Method,
    },
    /// A reply carried a sequence number other than the outstanding one.
    #[error("reply sequence {received} does not match request sequence {expected}")]
    SequenceMismatch {
        /// Sequence of the outstanding request.
        expected: u32,
        /// Sequence named by the reply.
        received: u32,
    },
    /// A frame expected to be a reply was flagged as a request, or vice versa.
    #[error("unexpected frame direction")]
    UnexpectedDirection,
    /// Row cells could not be encoded or decoded.
    #[error("malformed row: {0}")]
    Row(String),
    /// A row's width differs from the number of columns.
    #[error("row {row} has {width} cells but {columns} columns were announced")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Number of cells in the row.
        width: usize,
        /// Number of column names.
        columns: usize,
    },
    /// A successful authentication reply carried no session.
    #[error("successful authentication returned session id 0")]
    ZeroSession,
    /// I/O error occurred during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Whether the frame answered some request other than the outstanding one.
    ///
    /// After such a reply the stream no longer pairs replies with requests.
    #[must_use]
    pub const fn breaks_pairing(&self) -> bool {
        matches!(
            self,
            Self::MethodMismatch { .. } | Self::SequenceMismatch { .. } | Self::UnexpectedDirection
        )
    }
}
