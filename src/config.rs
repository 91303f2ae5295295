//! Client configuration.
//!
//! [`ClientConfig`] is layered by `ortho_config`: built-in defaults, then a
//! `.nebula.toml` dotfile, then `NEBULA_*` environment variables, then
//! command-line style arguments.

#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]
#![allow(
    unfulfilled_lint_expectations,
    reason = "derive macros conditionally generate items"
)]

use std::time::Duration;

use clap::Args;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::MAX_BODY_SIZE;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default server port.
pub const DEFAULT_PORT: u16 = 9669;
/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Default idle-read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

/// Reasons a [`ClientConfig`] is unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host cannot be empty")]
    EmptyHost,
    #[error("port cannot be zero")]
    ZeroPort,
    #[error("{0} cannot be zero")]
    ZeroTimeout(&'static str),
    #[error("max frame size cannot be zero")]
    ZeroFrameLimit,
}

/// Connection parameters for a graph server.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Args, OrthoConfig, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[ortho_config(prefix = "NEBULA_")]
pub struct ClientConfig {
    /// Server host name or address.
    #[ortho_config(default = DEFAULT_HOST.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_HOST))]
    pub host: String,
    /// Server port.
    #[ortho_config(default = DEFAULT_PORT)]
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Upper bound on establishing the TCP connection.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// Upper bound on waiting for each frame once connected.
    #[ortho_config(default = DEFAULT_READ_TIMEOUT_MS)]
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    pub read_timeout_ms: u64,
    /// Largest frame body accepted from or sent to the server.
    #[ortho_config(default = MAX_BODY_SIZE)]
    #[arg(long, default_value_t = MAX_BODY_SIZE)]
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self { Self::new(DEFAULT_HOST, DEFAULT_PORT) }
}

impl ClientConfig {
    /// Target `host:port` with default timeouts and frame limit.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_frame_bytes: MAX_BODY_SIZE,
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the idle-read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the largest accepted frame body.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }

    /// Idle-read timeout as a [`Duration`].
    #[must_use]
    pub const fn read_timeout(&self) -> Duration { Duration::from_millis(self.read_timeout_ms) }

    /// Target address in `host:port` form.
    #[must_use]
    pub fn addr(&self) -> String { format!("{}:{}", self.host, self.port) }

    /// Check that the configuration can be used to connect.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("connect timeout"));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("read timeout"));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::ZeroFrameLimit);
        }
        Ok(())
    }
}

fn duration_ms(timeout: Duration) -> u64 { u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
