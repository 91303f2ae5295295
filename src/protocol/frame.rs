//! Frame header layout and low-level integer helpers.
//!
//! This module owns the fixed 12-byte header format. Parameter blocks live in
//! [`super::params`] and stream framing in [`super::codec`].

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use bitflags::bitflags;

use super::{FrameError, HEADER_LEN, Method, PROTOCOL_VERSION};

bitflags! {
    /// Direction and delivery flags stored in the first header byte.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u8 {
        /// Bit 0: the frame answers a request.
        const REPLY = 1 << 0;
        /// Bit 1: the request must not be answered.
        const ONEWAY = 1 << 1;
    }
}

/// Read a big-endian `u16` from the provided byte slice.
///
/// # Errors
/// Returns an error if `buf` is shorter than two bytes.
pub fn read_u16(buf: &[u8]) -> Result<u16, FrameError> {
    buf.first_chunk::<2>()
        .map(|b| u16::from_be_bytes(*b))
        .ok_or(FrameError::ShortBuffer)
}

/// Read a big-endian `u32` from the provided byte slice.
///
/// # Errors
/// Returns an error if `buf` is shorter than four bytes.
pub fn read_u32(buf: &[u8]) -> Result<u32, FrameError> {
    buf.first_chunk::<4>()
        .map(|b| u32::from_be_bytes(*b))
        .ok_or(FrameError::ShortBuffer)
}

/// Read a big-endian `i32` from the provided byte slice.
///
/// # Errors
/// Returns an error if `buf` is shorter than four bytes.
pub fn read_i32(buf: &[u8]) -> Result<i32, FrameError> {
    buf.first_chunk::<4>()
        .map(|b| i32::from_be_bytes(*b))
        .ok_or(FrameError::ShortBuffer)
}

/// Read a big-endian `i64` from the provided byte slice.
///
/// # Errors
/// Returns an error if `buf` is shorter than eight bytes.
pub fn read_i64(buf: &[u8]) -> Result<i64, FrameError> {
    buf.first_chunk::<8>()
        .map(|b| i64::from_be_bytes(*b))
        .ok_or(FrameError::ShortBuffer)
}

/// Parsed frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Direction and delivery flags.
    pub flags: FrameFlags,
    /// Protocol version of the sender.
    pub version: u8,
    /// Raw method code; see [`Method`].
    pub method: u16,
    /// Sequence number pairing a reply with its request.
    pub seq: u32,
    /// Length of the body that follows the header.
    pub body_len: u32,
}

impl FrameHeader {
    /// Parse a frame header from a 12-byte buffer.
    ///
    /// Unknown flag bits are retained so [`validate`](Self::validate) can
    /// reject them.
    #[must_use = "use the returned header"]
    pub const fn from_bytes(buf: &[u8; HEADER_LEN]) -> Self {
        Self {
            flags: FrameFlags::from_bits_retain(buf[0]),
            version: buf[1],
            method: u16::from_be_bytes([buf[2], buf[3]]),
            seq: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            body_len: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        }
    }

    /// Serialise the header into its 12-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let (flags, rest) = buf.split_at_mut(1);
        let (version, rest) = rest.split_at_mut(1);
        let (method, rest) = rest.split_at_mut(2);
        let (seq, body_len) = rest.split_at_mut(4);
        flags.copy_from_slice(&[self.flags.bits()]);
        version.copy_from_slice(&[self.version]);
        method.copy_from_slice(&self.method.to_be_bytes());
        seq.copy_from_slice(&self.seq.to_be_bytes());
        body_len.copy_from_slice(&self.body_len.to_be_bytes());
        buf
    }

    /// Check the header against protocol constraints.
    ///
    /// # Errors
    /// Returns an error for undefined flag bits, a foreign protocol version,
    /// or a body longer than `max_body`.
    pub fn validate(&self, max_body: usize) -> Result<(), FrameError> {
        if FrameFlags::from_bits(self.flags.bits()).is_none() {
            return Err(FrameError::InvalidFlags(self.flags.bits()));
        }
        if self.version != PROTOCOL_VERSION {
            return Err(FrameError::UnsupportedVersion(self.version));
        }
        if self.body_len as usize > max_body {
            return Err(FrameError::PayloadTooLarge);
        }
        Ok(())
    }

    /// Decode the method code.
    ///
    /// # Errors
    /// Returns [`FrameError::UnknownMethod`] for codes outside [`Method`].
    pub fn method(&self) -> Result<Method, FrameError> {
        Method::try_from(self.method).map_err(FrameError::UnknownMethod)
    }

    /// Whether the frame answers a request.
    #[must_use]
    pub const fn is_reply(&self) -> bool { self.flags.contains(FrameFlags::REPLY) }
}

/// One complete frame: header plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header; `body_len` always equals `body.len()`.
    pub header: FrameHeader,
    /// Encoded parameter block.
    pub body: Vec<u8>,
}

impl Frame {
    fn with_flags(
        flags: FrameFlags,
        method: Method,
        seq: u32,
        body: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let body_len = u32::try_from(body.len()).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            header: FrameHeader {
                flags,
                version: PROTOCOL_VERSION,
                method: method.into(),
                seq,
                body_len,
            },
            body,
        })
    }

    /// Build a request frame. Methods without replies are flagged one-way.
    ///
    /// # Errors
    /// Returns [`FrameError::PayloadTooLarge`] when the body length does not
    /// fit the header field.
    pub fn request(method: Method, seq: u32, body: Vec<u8>) -> Result<Self, FrameError> {
        let flags = if method.expects_reply() {
            FrameFlags::empty()
        } else {
            FrameFlags::ONEWAY
        };
        Self::with_flags(flags, method, seq, body)
    }

    /// Build a reply frame answering `seq`.
    ///
    /// # Errors
    /// Returns [`FrameError::PayloadTooLarge`] when the body length does not
    /// fit the header field.
    pub fn reply(method: Method, seq: u32, body: Vec<u8>) -> Result<Self, FrameError> {
        Self::with_flags(FrameFlags::REPLY, method, seq, body)
    }

    /// Serialise the frame into a vector of bytes.
    #[must_use = "use the serialised bytes"]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.body.len());
        buf.extend_from_slice(&self.header.to_bytes());
        buf.extend_from_slice(&self.body);
        buf
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::protocol::MAX_BODY_SIZE;

    #[test]
    fn header_survives_wire_form() {
        let header = FrameHeader {
            flags: FrameFlags::REPLY,
            version: PROTOCOL_VERSION,
            method: 2,
            seq: 0xDEAD_BEEF,
            body_len: 513,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(FrameHeader::from_bytes(&bytes), header);
    }

    #[rstest]
    #[case(0b1000_0000, PROTOCOL_VERSION, 0, "invalid flags")]
    #[case(0, 9, 0, "unsupported protocol version 9")]
    #[case(0, PROTOCOL_VERSION, u32::MAX, "payload too large")]
    fn rejects_invalid_headers(
        #[case] flags: u8,
        #[case] version: u8,
        #[case] body_len: u32,
        #[case] expected: &str,
    ) {
        let header = FrameHeader {
            flags: FrameFlags::from_bits_retain(flags),
            version,
            method: 1,
            seq: 1,
            body_len,
        };
        let err = header.validate(MAX_BODY_SIZE).expect_err("header must be rejected");
        assert!(
            err.to_string().contains(expected),
            "expected '{expected}' in '{err}'"
        );
    }

    #[test]
    fn signout_requests_are_one_way() {
        let frame = Frame::request(Method::Signout, 4, Vec::new()).expect("frame");
        assert!(frame.header.flags.contains(FrameFlags::ONEWAY));
        assert!(!frame.header.is_reply());

        let frame = Frame::request(Method::Execute, 5, vec![0, 0]).expect("frame");
        assert!(frame.header.flags.is_empty());
        assert_eq!(frame.header.body_len, 2);
    }

    #[test]
    fn unknown_method_is_reported() {
        let header = FrameHeader {
            flags: FrameFlags::empty(),
            version: PROTOCOL_VERSION,
            method: 42,
            seq: 1,
            body_len: 0,
        };
        assert!(matches!(header.method(), Err(FrameError::UnknownMethod(42))));
    }

    #[rstest]
    #[case(&[0x00, 0x01], 1)]
    #[case(&[0xFF, 0xFF, 0x00], u16::MAX)]
    fn reads_u16_prefix(#[case] buf: &[u8], #[case] expected: u16) {
        assert_eq!(read_u16(buf).expect("u16"), expected);
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(matches!(read_u32(&[0, 1, 2]), Err(FrameError::ShortBuffer)));
        assert!(matches!(read_i64(&[0; 7]), Err(FrameError::ShortBuffer)));
        assert_eq!(read_i32(&(-5i32).to_be_bytes()).expect("i32"), -5);
    }
}
