//! Network module.
//!
//! Contains the connection capability (trait + framed client), the TCP/TLS
//! connector and TLS material loading.

pub mod connection;
mod connector;
pub mod tls;

pub use connection::{Connection, Connector, Event, IrcClient, WhoisRecord};
pub use connector::IrcConnector;
