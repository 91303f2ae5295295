//! Wire protocol spoken between the client and a graph-query server.
//!
//! Every message is a single frame: a fixed 12-byte [`FrameHeader`] followed
//! by a body of `body_len` bytes. Bodies are parameter blocks keyed by
//! [`FieldId`]; rows inside execute replies are bincode-encoded [`Value`]
//! sequences. The [`GraphCodec`] adapts this framing to
//! [`tokio_util::codec::Framed`].

pub mod codec;
pub mod errors;
pub mod field_id;
pub mod frame;
pub mod messages;
pub mod method;
pub mod params;
pub mod value;

pub use codec::GraphCodec;
pub use errors::FrameError;
pub use field_id::FieldId;
pub use frame::{Frame, FrameFlags, FrameHeader, read_i32, read_i64, read_u16, read_u32};
pub use messages::{AuthReply, ExecReply, Request};
pub use method::Method;
pub use params::{Params, encode_params};
pub use value::{Row, Value, decode_row, encode_row};

/// Length of a frame header in bytes.
pub const HEADER_LEN: usize = 12;
/// Protocol version written into every frame header.
pub const PROTOCOL_VERSION: u8 = 1;
/// Default upper bound for a single frame body.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024; // 16 MiB
