//! Owned IRC messages.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::parser::ParsedLine;
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// Commands are kept as their wire name (`PRIVMSG`, `001`, ...) with the
/// raw parameter list; the last parameter is the trailing one when present.
///
/// ```
/// use ircbridge_proto::Message;
///
/// let msg = Message::privmsg("#channel", "Hello!");
/// assert_eq!(msg.to_string(), "PRIVMSG #channel Hello!");
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// Upper-cased command name or three-digit numeric.
    pub command: String,
    /// Command parameters, trailing parameter last.
    pub params: Vec<String>,
}

impl Message {
    /// Build a message from a command and parameters.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Numeric reply code, if this is a numeric.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    /// `JOIN <channel>`
    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", [channel])
    }

    /// `NICK <nick>`
    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", [nick])
    }

    /// `USER <user> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname])
    }

    /// `QUIT [:<reason>]`
    pub fn quit(reason: Option<&str>) -> Self {
        Self::new("QUIT", reason)
    }

    /// `WHOIS <nick>`
    pub fn whois(nick: &str) -> Self {
        Self::new("WHOIS", [nick])
    }

    /// `PONG :<token>`
    pub fn pong(token: &str) -> Self {
        Self::new("PONG", [token])
    }

    /// `CAP REQ :<caps>`
    pub fn cap_req(caps: &str) -> Self {
        Self::new("CAP", ["REQ", caps])
    }

    /// `CAP END`
    pub fn cap_end() -> Self {
        Self::new("CAP", ["END"])
    }

    /// `AUTHENTICATE <payload>`
    pub fn authenticate(payload: &str) -> Self {
        Self::new("AUTHENTICATE", [payload])
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let line = ParsedLine::parse(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })?;

        Ok(Message {
            prefix: line.prefix.map(Prefix::new_from_str),
            command: line.command.to_ascii_uppercase(),
            params: line.params.into_iter().map(str::to_owned).collect(),
        })
    }
}

/// The last parameter needs a `:` when it is empty, contains a space, or
/// itself starts with `:`.
fn needs_colon(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {}", param)?;
            }
            if needs_colon(last) {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }

        Ok(())
    }
}
