//! Session client state machine.
//!
//! A [`Connection`] moves through
//! `Disconnected -> Connected -> Authenticated -> Connected -> Disconnected`.
//! Each RPC method is an `async fn` whose future resolves to exactly one
//! decoded result. At most one call is in flight: a call started while another
//! awaits its reply fails immediately with [`ClientError::CallInProgress`].
//!
//! Any transport failure during a call drops the socket, forgets the session
//! and leaves the connection [`Broken`](ConnectionState::Broken) until
//! [`Connection::close`] is called. So does a reply that answers the wrong
//! request, and so does a call whose future was dropped before its reply was
//! read: the next call finds the connection broken.

mod session;
mod state;

pub use session::Session;
pub use state::{ConnectionState, SessionId};
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use crate::{
    config::{ClientConfig, ConfigError},
    error::ClientError,
    protocol::{AuthReply, ExecReply, Frame, Request},
    response::{AuthResponse, ExecResponse, map_auth_reply, map_exec_reply},
    transport::Transport,
};

/// Statement used by [`Connection::ping`].
pub const PING_STATEMENT: &str = "YIELD 1";

#[derive(Debug)]
struct Io {
    transport: Transport,
    last_seq: u32,
    /// A request was written and its reply not yet consumed.
    awaiting_reply: bool,
}

impl Io {
    const fn next_seq(&mut self) -> u32 {
        self.last_seq = self.last_seq.wrapping_add(1);
        self.last_seq
    }
}

/// One logical connection to a graph server carrying at most one session.
#[derive(Debug)]
pub struct Connection {
    config: ClientConfig,
    state: watch::Sender<ConnectionState>,
    io: Mutex<Io>,
}

impl Connection {
    /// Create a disconnected client for the configured server.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the configuration is unusable.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let io = Io {
            transport: Transport::new(&config),
            last_seq: 0,
            awaiting_reply: false,
        };
        Ok(Self {
            config,
            state,
            io: Mutex::new(io),
        })
    }

    /// Configuration this connection was built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig { &self.config }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { *self.state.borrow() }

    /// Active session id, if authenticated.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> { self.state().session_id() }

    /// Whether a usable socket is held.
    #[must_use]
    pub fn is_open(&self) -> bool { self.state().is_open() }

    /// Handle over the active session, if authenticated.
    #[must_use]
    pub fn session(&self) -> Option<Session<'_>> {
        self.session_id().map(|id| Session::new(self, id))
    }

    fn begin_call(&self) -> Result<MutexGuard<'_, Io>, ClientError> {
        let mut io = self.io.try_lock().map_err(|_| ClientError::CallInProgress)?;
        if io.awaiting_reply {
            io.awaiting_reply = false;
            io.transport.close();
            let previous = self.set_state(ConnectionState::Broken);
            warn!(
                addr = io.transport.addr(),
                %previous,
                seq = io.last_seq,
                "previous call abandoned before its reply; connection broken"
            );
        }
        Ok(io)
    }

    fn set_state(&self, state: ConnectionState) -> ConnectionState { self.state.send_replace(state) }

    fn active_session(&self, operation: &'static str, given: i64) -> Result<SessionId, ClientError> {
        match self.state() {
            ConnectionState::Authenticated(active) if active.get() == given => Ok(active),
            ConnectionState::Authenticated(active) => {
                Err(ClientError::InvalidSession { given, active })
            }
            actual => Err(ClientError::InvalidState { operation, actual }),
        }
    }

    /// Mark the connection broken when `result` failed at the transport level
    /// or left replies out of step with requests.
    fn settle<T>(&self, io: &mut Io, result: Result<T, ClientError>) -> Result<T, ClientError> {
        let Err(err) = &result else {
            return result;
        };
        if err.is_transport() || err.is_out_of_sync() || !io.transport.is_open() {
            io.transport.close();
            let previous = self.set_state(ConnectionState::Broken);
            warn!(
                addr = io.transport.addr(),
                %previous,
                error = %err,
                "call failed; connection broken"
            );
        }
        result
    }

    async fn exchange(&self, io: &mut Io, request: &Request) -> Result<(u32, Frame), ClientError> {
        let seq = io.next_seq();
        let frame = request.to_frame(seq)?;
        io.awaiting_reply = true;
        let reply = match io.transport.send(frame).await {
            Ok(()) => io.transport.recv().await,
            Err(e) => Err(e),
        };
        io.awaiting_reply = false;
        self.settle(io, reply).map(|frame| (seq, frame))
    }

    /// Connect to the server.
    ///
    /// Does nothing when already connected or authenticated. On failure the
    /// connection stays [`Disconnected`](ConnectionState::Disconnected).
    ///
    /// # Errors
    /// Returns the transport's connect error, [`ClientError::InvalidState`]
    /// when the connection is broken, or [`ClientError::CallInProgress`].
    pub async fn open(&self) -> Result<(), ClientError> {
        let mut io = self.begin_call()?;
        match self.state() {
            ConnectionState::Disconnected => {}
            ConnectionState::Connected | ConnectionState::Authenticated(_) => return Ok(()),
            actual @ ConnectionState::Broken => {
                return Err(ClientError::InvalidState {
                    operation: "open",
                    actual,
                });
            }
        }
        io.transport.open().await?;
        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    /// Exchange credentials for a session.
    ///
    /// A rejection is returned as [`AuthResponse::Rejected`] and leaves the
    /// connection [`Connected`](ConnectionState::Connected).
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidState`] unless connected without a
    /// session, [`ClientError::Decode`] for malformed replies, or a transport
    /// error.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let mut io = self.begin_call()?;
        let actual = self.state();
        if actual != ConnectionState::Connected {
            return Err(ClientError::InvalidState {
                operation: "authenticate",
                actual,
            });
        }
        let request = Request::Authenticate {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let (seq, frame) = self.exchange(&mut io, &request).await?;
        let reply = AuthReply::from_frame(&frame, seq).map_err(ClientError::from);
        let response = map_auth_reply(self.settle(&mut io, reply)?)?;
        match &response {
            AuthResponse::Authenticated(id) => {
                self.set_state(ConnectionState::Authenticated(*id));
                info!(addr = io.transport.addr(), session_id = id.get(), "authenticated");
            }
            AuthResponse::Rejected(failure) => {
                warn!(
                    addr = io.transport.addr(),
                    username,
                    code = failure.code.code(),
                    "authentication rejected"
                );
            }
        }
        Ok(response)
    }

    /// Run `statement` in the active session.
    ///
    /// Server-side failures are returned inside the [`ExecResponse`].
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidState`] without an active session,
    /// [`ClientError::InvalidSession`] when `session_id` is not the active
    /// one, [`ClientError::Decode`] for malformed replies, or a transport
    /// error. A reply that does not arrive within the read timeout is
    /// [`ClientError::ReadTimeout`]; a request that cannot be written within
    /// it is [`ClientError::Io`] with [`std::io::ErrorKind::TimedOut`].
    pub async fn execute(
        &self,
        session_id: i64,
        statement: &str,
    ) -> Result<ExecResponse, ClientError> {
        let mut io = self.begin_call()?;
        let active = self.active_session("execute", session_id)?;
        let request = Request::Execute {
            session_id: active.get(),
            statement: statement.to_owned(),
        };
        let (seq, frame) = self.exchange(&mut io, &request).await?;
        let reply = ExecReply::from_frame(&frame, seq).map_err(ClientError::from);
        let response = map_exec_reply(self.settle(&mut io, reply)?)?;
        debug!(
            session_id,
            seq,
            code = response.error_code().code(),
            latency_us = response.latency_us(),
            "statement executed"
        );
        Ok(response)
    }

    /// Release the active session.
    ///
    /// The request is one-way: no reply is awaited. The connection returns
    /// to [`Connected`](ConnectionState::Connected) once the request is
    /// written.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidState`] without an active session,
    /// [`ClientError::InvalidSession`] when `session_id` is not the active
    /// one, or a transport error.
    pub async fn signout(&self, session_id: i64) -> Result<(), ClientError> {
        let mut io = self.begin_call()?;
        let active = self.active_session("signout", session_id)?;
        let seq = io.next_seq();
        let frame = Request::Signout {
            session_id: active.get(),
        }
        .to_frame(seq)?;
        io.awaiting_reply = true;
        let sent = io.transport.send(frame).await;
        io.awaiting_reply = false;
        self.settle(&mut io, sent)?;
        self.set_state(ConnectionState::Connected);
        info!(addr = io.transport.addr(), session_id, "signed out");
        Ok(())
    }

    /// Check that `session_id` is still accepted by running
    /// [`PING_STATEMENT`].
    ///
    /// # Errors
    /// As for [`execute`](Self::execute).
    pub async fn ping(&self, session_id: i64) -> Result<bool, ClientError> {
        Ok(self.execute(session_id, PING_STATEMENT).await?.is_succeeded())
    }

    /// Drop the socket and return to
    /// [`Disconnected`](ConnectionState::Disconnected).
    ///
    /// Valid in every state and safe to repeat. An active session is not
    /// signed out. If a call is in flight, waits for it to finish first.
    pub async fn close(&self) {
        let mut io = self.io.lock().await;
        io.awaiting_reply = false;
        io.transport.close();
        let previous = self.set_state(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            info!(addr = io.transport.addr(), %previous, "connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use rstest::rstest;
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    use super::*;
    use crate::protocol::GraphCodec;

    fn unreachable_config() -> ClientConfig { ClientConfig::new("127.0.0.1", 9) }

    /// Accept one client and answer its first request with `reply`.
    async fn scripted_server(
        reply: impl FnOnce(u32) -> Frame + Send + 'static,
    ) -> ClientConfig {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let mut framed = Framed::new(socket, GraphCodec::new());
            let request = framed.next().await.expect("request").expect("frame");
            framed.send(reply(request.header.seq)).await.expect("reply");
            // Hold the socket until the client goes away.
            let _rest = framed.next().await;
        });
        ClientConfig::new("127.0.0.1", port).with_read_timeout(Duration::from_secs(2))
    }

    #[test]
    fn rejects_unusable_config() {
        let err = Connection::new(ClientConfig::new("", 9669)).expect_err("empty host");
        assert_eq!(err, ConfigError::EmptyHost);
    }

    #[rstest]
    #[case::authenticate("authenticate")]
    #[case::execute("execute")]
    #[case::signout("signout")]
    #[tokio::test]
    async fn calls_need_an_open_connection(#[case] operation: &str) {
        let conn = Connection::new(unreachable_config()).expect("config");
        let err = match operation {
            "authenticate" => conn.authenticate("root", "nebula").await.map(|_| ()),
            "execute" => conn.execute(1, "SHOW SPACES").await.map(|_| ()),
            _ => conn.signout(1).await,
        }
        .expect_err("must be rejected");
        assert!(
            matches!(
                err,
                ClientError::InvalidState {
                    actual: ConnectionState::Disconnected,
                    ..
                }
            ),
            "got {err:?}"
        );
        assert!(conn.session().is_none());
    }

    #[tokio::test]
    async fn close_without_open_is_harmless() {
        let conn = Connection::new(unreachable_config()).expect("config");
        conn.close().await;
        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn busy_connection_reports_call_in_progress() {
        let conn = Connection::new(unreachable_config()).expect("config");
        let _guard = conn.begin_call().expect("first call");
        let err = conn.open().await.expect_err("second call");
        assert!(matches!(err, ClientError::CallInProgress));
    }

    #[tokio::test]
    async fn reply_with_wrong_sequence_is_decode_error() {
        let cfg = scripted_server(|seq| {
            AuthReply {
                error_code: 0,
                session_id: 1,
                error_msg: None,
            }
            .to_frame(seq.wrapping_add(1))
            .expect("frame")
        })
        .await;
        let conn = Connection::new(cfg).expect("config");
        conn.open().await.expect("open");
        let err = conn.authenticate("root", "nebula").await.expect_err("mismatch");
        assert!(
            matches!(
                err,
                ClientError::Decode(crate::protocol::FrameError::SequenceMismatch { .. })
            ),
            "got {err:?}"
        );
        assert_eq!(conn.state(), ConnectionState::Broken);
        assert!(!conn.is_open());
        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn abandoned_call_breaks_connection() {
        let conn = Connection::new(unreachable_config()).expect("config");
        conn.set_state(ConnectionState::Connected);
        conn.io.lock().await.awaiting_reply = true;

        let err = conn.authenticate("root", "nebula").await.expect_err("broken");
        assert!(
            matches!(
                err,
                ClientError::InvalidState {
                    actual: ConnectionState::Broken,
                    ..
                }
            ),
            "got {err:?}"
        );
        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.io.lock().await.awaiting_reply);
    }

    #[tokio::test]
    async fn success_without_session_is_decode_error() {
        let cfg = scripted_server(|seq| {
            AuthReply {
                error_code: 0,
                session_id: 0,
                error_msg: None,
            }
            .to_frame(seq)
            .expect("frame")
        })
        .await;
        let conn = Connection::new(cfg).expect("config");
        conn.open().await.expect("open");
        let err = conn.authenticate("root", "nebula").await.expect_err("zero");
        assert!(matches!(
            err,
            ClientError::Decode(crate::protocol::FrameError::ZeroSession)
        ));
        assert_eq!(conn.session_id(), None);
        conn.close().await;
    }
}
