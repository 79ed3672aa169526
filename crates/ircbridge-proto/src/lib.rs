//! # ircbridge-proto
//!
//! The client-side subset of the IRC protocol that ircbridge drives:
//! line framing, message parsing and serialization, the numerics a client
//! reacts to, and SASL PLAIN encoding.
//!
//! ```rust
//! use ircbridge_proto::Message;
//!
//! let msg: Message = ":alice!a@host PRIVMSG #rust :hello there".parse().unwrap();
//! assert_eq!(msg.source_nickname(), Some("alice"));
//! assert_eq!(msg.to_string(), ":alice!a@host PRIVMSG #rust :hello there");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod codec;
pub mod error;
pub mod message;
mod parser;
pub mod prefix;
pub mod response;
pub mod sasl;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::codec::IrcCodec;
pub use self::error::ProtocolError;
pub use self::message::Message;
pub use self::prefix::Prefix;
