//! ircbridge - an IRC agent for a host message bus.
//!
//! An [`IrcAgent`] keeps one IRC connection on its own thread, relays
//! channel and private messages to a [`Host`] tagged with the sender's
//! services account, and sends the host's replies back to IRC.

pub mod agent;
pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod network;
pub mod supervisor;
pub mod telemetry;

pub use agent::IrcAgent;
pub use config::Config;
pub use host::{Host, HostMessage, OutboundRequest};
