//! In-process mock graph server used by integration suites.
//!
//! [`MockGraphServer`] binds a loopback listener and answers requests with a
//! fixed script:
//!
//! | Statement     | Reply                                          |
//! |---------------|------------------------------------------------|
//! | `SHOW SPACES` | success, no columns, no rows                   |
//! | `YIELD 1`     | success, column `1`, one row holding `1`       |
//! | `SLEEP <ms>`  | empty success after `<ms>` milliseconds        |
//! | `GARBLE`      | reply frame whose body cannot be parsed        |
//! | `DROP`        | socket closed without a reply                  |
//! | anything else | syntax error                                   |
//!
//! Executing with an unknown session yields a session-invalid failure.

mod state;

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use nebula_client::{
    ClientConfig,
    protocol::{Frame, GraphCodec, Method, Request},
};
use state::{Action, ServerState};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::{Instant, sleep},
};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::AnyError;

/// Username accepted by default.
pub const USERNAME: &str = "root";
/// Password accepted by default.
pub const PASSWORD: &str = "nebula";

/// Running mock server. Shuts down when dropped.
#[derive(Debug)]
pub struct MockGraphServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MockGraphServer {
    /// Start a server accepting [`USERNAME`] / [`PASSWORD`].
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> Result<Self, AnyError> {
        Self::start_with_credentials(USERNAME, PASSWORD).await
    }

    /// Start a server accepting the given credentials.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn start_with_credentials(username: &str, password: &str) -> Result<Self, AnyError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState::new(username, password));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_connections(listener, Arc::clone(&state), shutdown_rx));
        info!(%addr, "mock graph server listening");
        Ok(Self {
            addr,
            state,
            shutdown,
            task: Some(task),
        })
    }

    /// Bound address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr { self.addr }

    /// Client configuration targeting this server with short timeouts.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.addr.ip().to_string(), self.addr.port())
            .with_connect_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_secs(2))
    }

    /// Sessions issued and not yet signed out.
    #[must_use]
    pub fn active_sessions(&self) -> usize { self.state.active_sessions() }

    /// Signout requests received so far.
    #[must_use]
    pub fn signouts(&self) -> usize { self.state.signouts() }

    /// Wait until at least `count` signouts have arrived.
    ///
    /// Signout is one-way, so tests poll for its effect.
    ///
    /// # Errors
    /// Returns an error if `within` elapses first.
    pub async fn wait_for_signouts(&self, count: usize, within: Duration) -> Result<(), AnyError> {
        let deadline = Instant::now() + within;
        while self.signouts() < count {
            if Instant::now() >= deadline {
                anyhow::bail!(
                    "expected {count} signouts within {within:?}, saw {}",
                    self.signouts()
                );
            }
            sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }

    /// Stop accepting and close every client socket.
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            warn!(error = %e, "mock server task failed");
        }
    }
}

impl Drop for MockGraphServer {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn accept_connections(
    listener: TcpListener,
    state: Arc<ServerState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut join_set = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            res = listener.accept() => {
                handle_accept_result(res, &state, &shutdown_rx, &mut join_set);
            }
        }
    }
    join_set.shutdown().await;
}

fn handle_accept_result(
    res: io::Result<(TcpStream, SocketAddr)>,
    state: &Arc<ServerState>,
    shutdown_rx: &watch::Receiver<bool>,
    join_set: &mut JoinSet<()>,
) {
    match res {
        Ok((socket, peer)) => {
            let state = Arc::clone(state);
            let mut rx = shutdown_rx.clone();
            join_set.spawn(async move {
                if let Err(e) = handle_client(socket, &state, &mut rx).await {
                    debug!(%peer, error = %e, "mock connection ended with error");
                }
            });
        }
        Err(e) => warn!(error = %e, "accept error"),
    }
}

async fn handle_client(
    socket: TcpStream,
    state: &ServerState,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), AnyError> {
    let mut framed = Framed::new(socket, GraphCodec::new());
    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            next = framed.next() => match next {
                Some(frame) => frame?,
                None => return Ok(()),
            },
        };
        let seq = frame.header.seq;
        match Request::from_frame(&frame)? {
            Request::Authenticate { username, password } => {
                let reply = state.authenticate(&username, &password);
                framed.send(reply.to_frame(seq)?).await?;
            }
            Request::Execute {
                session_id,
                statement,
            } => match state.execute(session_id, &statement) {
                Action::Reply(reply) => framed.send(reply.to_frame(seq)?).await?,
                Action::Delay(delay, reply) => {
                    sleep(delay).await;
                    framed.send(reply.to_frame(seq)?).await?;
                }
                Action::Garble => {
                    framed
                        .send(Frame::reply(Method::Execute, seq, vec![0, 1, 0])?)
                        .await?;
                }
                Action::Drop => return Ok(()),
            },
            Request::Signout { session_id } => state.signout(session_id),
        }
    }
}
