//! Session-oriented RPC client for graph-query servers.
//!
//! The crate connects to a server over a framed TCP transport, exchanges
//! credentials for a session, runs statements in that session and tears the
//! session and socket down again. One [`Connection`] carries at most one
//! session and at most one call in flight.
//!
//! ```rust,no_run
//! use nebula_client::{AuthResponse, ClientConfig, Connection};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = Connection::new(ClientConfig::new("127.0.0.1", 9669))?;
//! conn.open().await?;
//! if let AuthResponse::Authenticated(id) = conn.authenticate("root", "nebula").await? {
//!     let resp = conn.execute(id.get(), "SHOW SPACES").await?;
//!     println!("{:?}", resp.data());
//!     conn.signout(id.get()).await?;
//! }
//! conn.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod response;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use connection::{Connection, ConnectionState, PING_STATEMENT, Session, SessionId};
pub use error::ClientError;
pub use response::{
    AuthResponse,
    DataSet,
    ErrorCode,
    ExecOutcome,
    ExecResponse,
    ServerFailure,
    map_auth_reply,
    map_exec_reply,
};
pub use transport::Transport;
