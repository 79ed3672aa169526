//! Unified error handling for ircbridge.
//!
//! Errors are split by the boundary they cross: startup errors reach the
//! host's agent-loading path, connection errors end a supervisor run, and
//! shutdown errors come back from `stop()`.

use ircbridge_proto::ProtocolError;
use thiserror::Error;

use crate::config::ConfigError;

// ============================================================================
// Connection Errors (inside the execution context)
// ============================================================================

/// Errors raised by a live IRC connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("registration timed out")]
    RegistrationTimeout,

    #[error("server refused registration: {0}")]
    RegistrationRejected(String),

    #[error("sasl authentication failed: {0}")]
    SaslFailed(String),

    #[error("whois for {0} timed out")]
    WhoisTimeout(String),

    #[error("connection closed by server")]
    Closed,

    #[error("{0}")]
    Other(String),
}

impl ConnectionError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
            Self::Tls(_) => "tls",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::RegistrationTimeout => "registration_timeout",
            Self::RegistrationRejected(_) => "registration_rejected",
            Self::SaslFailed(_) => "sasl_failed",
            Self::WhoisTimeout(_) => "whois_timeout",
            Self::Closed => "closed",
            Self::Other(_) => "other",
        }
    }
}

// ============================================================================
// Startup / Shutdown Errors (host-facing)
// ============================================================================

/// Errors that make agent initialization fail.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load tls materials: {0}")]
    Tls(String),

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to spawn connection thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors returned by a graceful stop.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("connection thread did not exit within {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection thread panicked")]
    Panicked,

    #[error("agent is not running")]
    NotRunning,
}
