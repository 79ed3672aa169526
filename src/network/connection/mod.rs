//! Connection - the IRC capability the supervisor drives.
//!
//! A [`Connector`] opens and registers one connection; the resulting
//! [`Connection`] is owned by the supervisor's execution context and is only
//! ever touched from there.
//!
//! ```text
//! Connector::connect ──▶ handshake (CAP/SASL, NICK/USER, 001)
//!                              │
//!                              ▼
//!        Connection: next_event ◀── framed reads, PING answered inline
//!                    join / send / whois / quit
//! ```

mod client;
mod handshake;

pub use client::IrcClient;
pub use handshake::register;

use crate::error::ConnectionError;
use async_trait::async_trait;

/// Inbound events the bridge reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ChannelMessage {
        target: String,
        author: String,
        text: String,
    },
    PrivateMessage {
        author: String,
        text: String,
    },
    Quit {
        nick: String,
    },
    NickChange {
        old: String,
        new: String,
    },
    JoinFailed {
        channel: String,
        reason: String,
    },
}

/// Result of a WHOIS lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoisRecord {
    /// Whether the server reported the nick as identified with services.
    pub identified: bool,
    /// Account name from RPL_WHOISACCOUNT, when sent.
    pub account: Option<String>,
}

impl WhoisRecord {
    pub fn identified(account: impl Into<String>) -> Self {
        Self {
            identified: true,
            account: Some(account.into()),
        }
    }

    pub fn unidentified() -> Self {
        Self::default()
    }
}

/// A registered IRC connection.
#[async_trait]
pub trait Connection: Send {
    /// Our current nickname on the server.
    fn nickname(&self) -> &str;

    /// Next inbound event. `Ok(None)` means the server closed the connection.
    ///
    /// Must be cancel-safe: it is raced against submitted actions.
    async fn next_event(&mut self) -> Result<Option<Event>, ConnectionError>;

    /// Request to join a channel. Refusals arrive later as [`Event::JoinFailed`].
    async fn join(&mut self, channel: &str) -> Result<(), ConnectionError>;

    /// Send text to a channel or nick.
    async fn send(&mut self, target: &str, text: &str) -> Result<(), ConnectionError>;

    /// Query a nick's identification status, waiting for the full reply.
    async fn whois(&mut self, nick: &str) -> Result<WhoisRecord, ConnectionError>;

    /// Send QUIT and flush it to the wire.
    async fn quit(&mut self, reason: Option<&str>) -> Result<(), ConnectionError>;
}

/// Opens connections for a supervisor run.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        config: &crate::config::Config,
    ) -> Result<Box<dyn Connection>, ConnectionError>;
}
