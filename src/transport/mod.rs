//! Framed TCP transport to a graph server.
//!
//! A [`Transport`] owns at most one socket, wrapped in a
//! [`Framed`](tokio_util::codec::Framed) stream using [`GraphCodec`]. Every
//! read and write is bounded by the idle timeout; connecting is bounded by the
//! connect timeout.

use std::{io, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpStream, time::timeout};
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::{
    config::ClientConfig,
    error::ClientError,
    protocol::{Frame, GraphCodec},
};

/// Exclusive owner of the socket used by a [`Connection`](crate::Connection).
#[derive(Debug)]
pub struct Transport {
    addr: String,
    connect_timeout: Duration,
    idle_timeout: Duration,
    max_body: usize,
    framed: Option<Framed<TcpStream, GraphCodec>>,
}

impl Transport {
    /// Create a closed transport targeting the configured server.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            addr: config.addr(),
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.read_timeout(),
            max_body: config.max_frame_bytes,
            framed: None,
        }
    }

    /// Target address in `host:port` form.
    #[must_use]
    pub fn addr(&self) -> &str { &self.addr }

    /// Whether a socket is currently held.
    #[must_use]
    pub const fn is_open(&self) -> bool { self.framed.is_some() }

    /// Connect to the server. Does nothing when already open.
    ///
    /// # Errors
    /// Returns [`ClientError::ConnectTimeout`] when the deadline elapses,
    /// [`ClientError::ConnectionRefused`] when the peer refuses, and
    /// [`ClientError::UnreachableHost`] for any other connect failure.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        if self.framed.is_some() {
            return Ok(());
        }
        let stream = match timeout(self.connect_timeout, TcpStream::connect(self.addr.as_str())).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(self.classify_connect_error(e)),
            Err(_) => {
                return Err(ClientError::ConnectTimeout {
                    addr: self.addr.clone(),
                    timeout: self.connect_timeout,
                });
            }
        };
        stream.set_nodelay(true).map_err(ClientError::Io)?;
        let peer = stream.peer_addr().map_err(ClientError::Io)?;
        info!(addr = %self.addr, peer = %peer, "connected to graph server");
        self.framed = Some(Framed::new(
            stream,
            GraphCodec::new().with_max_body(self.max_body),
        ));
        Ok(())
    }

    fn classify_connect_error(&self, error: io::Error) -> ClientError {
        if error.kind() == io::ErrorKind::ConnectionRefused {
            ClientError::ConnectionRefused {
                addr: self.addr.clone(),
            }
        } else {
            ClientError::UnreachableHost {
                addr: self.addr.clone(),
                source: error,
            }
        }
    }

    /// Drop the socket. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.framed.take().is_some() {
            debug!(addr = %self.addr, "transport closed");
        }
    }

    fn framed(&mut self) -> Result<&mut Framed<TcpStream, GraphCodec>, ClientError> {
        self.framed
            .as_mut()
            .ok_or_else(|| ClientError::Io(io::Error::from(io::ErrorKind::NotConnected)))
    }

    /// Write one frame.
    ///
    /// # Errors
    /// Returns [`ClientError::Io`] when the write fails or does not finish
    /// within the idle timeout, and [`ClientError::Decode`] when the frame
    /// cannot be encoded.
    pub async fn send(&mut self, frame: Frame) -> Result<(), ClientError> {
        let idle = self.idle_timeout;
        let method = frame.header.method;
        let seq = frame.header.seq;
        let body_len = frame.header.body_len;
        let framed = self.framed()?;
        match timeout(idle, framed.send(frame)).await {
            Ok(result) => result?,
            Err(_) => return Err(ClientError::Io(io::Error::from(io::ErrorKind::TimedOut))),
        }
        debug!(method, seq, body_len, "sent frame");
        Ok(())
    }

    /// Read exactly one frame.
    ///
    /// A frame the codec rejects leaves the stream unusable, so the socket is
    /// dropped before the error is returned.
    ///
    /// # Errors
    /// Returns [`ClientError::ReadTimeout`] when no complete frame arrives
    /// within the idle timeout, [`ClientError::Io`] on read failure or peer
    /// close, and [`ClientError::Decode`] for malformed frames.
    pub async fn recv(&mut self) -> Result<Frame, ClientError> {
        let idle = self.idle_timeout;
        let framed = self.framed()?;
        let next = match timeout(idle, framed.next()).await {
            Ok(next) => next,
            Err(_) => return Err(ClientError::ReadTimeout(idle)),
        };
        match next {
            Some(Ok(frame)) => {
                debug!(
                    method = frame.header.method,
                    seq = frame.header.seq,
                    body_len = frame.header.body_len,
                    "received frame"
                );
                Ok(frame)
            }
            Some(Err(e)) => {
                self.close();
                Err(e.into())
            }
            None => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    use super::*;
    use crate::protocol::{FrameFlags, FrameHeader, HEADER_LEN, Method};

    async fn listener() -> (TcpListener, ClientConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let cfg = ClientConfig::new("127.0.0.1", port)
            .with_connect_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_millis(100));
        (listener, cfg)
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let (listener, cfg) = listener().await;
        let mut transport = Transport::new(&cfg);
        transport.open().await.expect("open");
        transport.open().await.expect("second open");
        assert!(transport.is_open());
        let (_socket, _) = listener.accept().await.expect("accept");
        transport.close();
        transport.close();
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn refused_when_nothing_listens() {
        let (listener, cfg) = listener().await;
        drop(listener);
        let mut transport = Transport::new(&cfg);
        let err = transport.open().await.expect_err("open must fail");
        assert!(
            matches!(err, ClientError::ConnectionRefused { .. }),
            "got {err:?}"
        );
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn unresolvable_host_is_unreachable() {
        let cfg = ClientConfig::new("", 9669).with_connect_timeout(Duration::from_secs(5));
        let err = Transport::new(&cfg).open().await.expect_err("open must fail");
        assert!(matches!(err, ClientError::UnreachableHost { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (listener, cfg) = listener().await;
        let mut transport = Transport::new(&cfg);
        transport.open().await.expect("open");
        let (_socket, _) = listener.accept().await.expect("accept");
        let err = transport.recv().await.expect_err("no frame");
        assert!(matches!(err, ClientError::ReadTimeout(d) if d == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn peer_close_is_io_error() {
        let (listener, cfg) = listener().await;
        let mut transport = Transport::new(&cfg);
        transport.open().await.expect("open");
        let (socket, _) = listener.accept().await.expect("accept");
        drop(socket);
        let err = transport.recv().await.expect_err("closed");
        assert!(
            matches!(err, ClientError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn bad_header_drops_socket() {
        let (listener, cfg) = listener().await;
        let mut transport = Transport::new(&cfg);
        transport.open().await.expect("open");
        let (mut socket, _) = listener.accept().await.expect("accept");
        let header = FrameHeader {
            flags: FrameFlags::REPLY,
            version: 7,
            method: Method::Execute.into(),
            seq: 1,
            body_len: 0,
        };
        let bytes: [u8; HEADER_LEN] = header.to_bytes();
        socket.write_all(&bytes).await.expect("write");
        let err = transport.recv().await.expect_err("bad version");
        assert!(matches!(err, ClientError::Decode(_)), "got {err:?}");
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn send_requires_open_socket() {
        let (_listener, cfg) = listener().await;
        let mut transport = Transport::new(&cfg);
        let frame = Frame::request(Method::Signout, 1, Vec::new()).expect("frame");
        let err = transport.send(frame).await.expect_err("closed");
        assert!(matches!(err, ClientError::Io(ref e) if e.kind() == io::ErrorKind::NotConnected));
    }
}
