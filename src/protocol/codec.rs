//! Tokio codec adapter for graph RPC framing.
//!
//! [`GraphCodec`] implements Tokio's [`Decoder`] and [`Encoder`] traits so a
//! socket can be wrapped in [`tokio_util::codec::Framed`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use nebula_client::protocol::GraphCodec;
//!
//! async fn wrap(stream: TcpStream) {
//!     let mut framed = Framed::new(stream, GraphCodec::new());
//!     // Use framed.next() and framed.send() for frame I/O
//! }
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{Frame, FrameError, FrameHeader, HEADER_LEN, MAX_BODY_SIZE};

/// Tokio codec for graph RPC frames.
///
/// # Frame Format
///
/// | Field    | Offset | Size | Description                              |
/// |----------|--------|------|------------------------------------------|
/// | flags    | 0      | 1    | bit 0 reply, bit 1 one-way               |
/// | version  | 1      | 1    | Protocol version (1)                     |
/// | method   | 2      | 2    | RPC method code                          |
/// | seq      | 4      | 4    | Sequence number echoed by the reply      |
/// | body_len | 8      | 4    | Body size in bytes                       |
/// | body     | 12     | var  | Parameter block (`body_len` bytes)       |
#[derive(Debug, Clone)]
pub struct GraphCodec {
    max_body: usize,
}

impl Default for GraphCodec {
    fn default() -> Self { Self::new() }
}

impl GraphCodec {
    /// Create a codec with the default body limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_body: MAX_BODY_SIZE,
        }
    }

    /// Override the maximum accepted body size.
    #[must_use]
    pub const fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    /// Return the maximum accepted body size.
    #[must_use]
    pub const fn max_body(&self) -> usize { self.max_body }
}

impl Decoder for GraphCodec {
    type Error = FrameError;
    type Item = Frame;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header_bytes) = src.first_chunk::<HEADER_LEN>() else {
            return Ok(None);
        };
        let header = FrameHeader::from_bytes(header_bytes);
        header.validate(self.max_body)?;

        let frame_len = HEADER_LEN + header.body_len as usize;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let body = src.split_to(header.body_len as usize).to_vec();
        Ok(Some(Frame { header, body }))
    }
}

impl Encoder<Frame> for GraphCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body.len() > self.max_body {
            return Err(FrameError::PayloadTooLarge);
        }
        if item.header.body_len as usize != item.body.len() {
            return Err(FrameError::SizeMismatch);
        }
        item.header.validate(self.max_body)?;
        dst.reserve(HEADER_LEN + item.body.len());
        dst.put_slice(&item.header.to_bytes());
        dst.put_slice(&item.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::protocol::{FrameFlags, Method, PROTOCOL_VERSION};

    fn execute_frame(body: Vec<u8>) -> Frame {
        Frame::request(Method::Execute, 7, body).expect("frame")
    }

    #[test]
    fn waits_for_complete_frame() {
        let frame = execute_frame(vec![1, 2, 3, 4]);
        let bytes = frame.to_bytes();
        let mut codec = GraphCodec::new();

        let mut buf = BytesMut::from(bytes.get(..HEADER_LEN + 2).expect("prefix"));
        assert!(codec.decode(&mut buf).expect("partial decode").is_none());

        buf.extend_from_slice(bytes.get(HEADER_LEN + 2..).expect("suffix"));
        let decoded = codec.decode(&mut buf).expect("decode").expect("frame");
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let first = execute_frame(vec![9]);
        let second = Frame::reply(Method::Authenticate, 8, Vec::new()).expect("frame");
        let mut buf = BytesMut::new();
        let mut codec = GraphCodec::new();
        codec.encode(first.clone(), &mut buf).expect("encode first");
        codec.encode(second.clone(), &mut buf).expect("encode second");

        assert_eq!(codec.decode(&mut buf).expect("first").expect("frame"), first);
        assert_eq!(codec.decode(&mut buf).expect("second").expect("frame"), second);
        assert!(codec.decode(&mut buf).expect("drained").is_none());
    }

    #[rstest]
    #[case::oversized(FrameFlags::empty(), PROTOCOL_VERSION, 64, "payload too large")]
    #[case::bad_flags(FrameFlags::from_bits_retain(0x10), PROTOCOL_VERSION, 0, "invalid flags")]
    #[case::bad_version(FrameFlags::empty(), 2, 0, "unsupported protocol version")]
    fn rejects_invalid_headers_before_body(
        #[case] flags: FrameFlags,
        #[case] version: u8,
        #[case] body_len: u32,
        #[case] expected: &str,
    ) {
        let header = FrameHeader {
            flags,
            version,
            method: 2,
            seq: 1,
            body_len,
        };
        let mut buf = BytesMut::from(&header.to_bytes()[..]);
        let mut codec = GraphCodec::new().with_max_body(32);
        let err = codec.decode(&mut buf).expect_err("header must be rejected");
        assert!(
            err.to_string().contains(expected),
            "expected '{expected}' in '{err}'"
        );
    }

    #[test]
    fn refuses_to_encode_inconsistent_length() {
        let mut frame = execute_frame(vec![1, 2]);
        frame.header.body_len = 5;
        let mut buf = BytesMut::new();
        assert!(matches!(
            GraphCodec::new().encode(frame, &mut buf),
            Err(FrameError::SizeMismatch)
        ));
    }

    proptest! {
        #[test]
        fn arbitrary_input_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            let mut buf = BytesMut::from(bytes.as_slice());
            let mut codec = GraphCodec::new().with_max_body(64);
            while let Ok(Some(_frame)) = codec.decode(&mut buf) {}
        }
    }
}
