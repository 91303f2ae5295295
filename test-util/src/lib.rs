//! Utilities for integration tests.
//!
//! The `test-util` crate provides an in-process mock graph server speaking
//! the client's wire protocol, plus small socket helpers. It is used by the
//! integration tests of the main crate.

use std::net::TcpListener;

pub mod server;

pub use server::{MockGraphServer, PASSWORD, USERNAME};

/// Error type returned by test helpers.
pub type AnyError = anyhow::Error;

/// Return a loopback port with no listener behind it.
///
/// # Errors
/// Returns an error if a probe socket cannot be bound.
pub fn unused_port() -> Result<u16, AnyError> {
    let socket = TcpListener::bind("127.0.0.1:0")?;
    let port = socket.local_addr()?.port();
    drop(socket);
    Ok(port)
}
