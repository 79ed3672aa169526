//! The host message bus contract.
//!
//! The host sees two message shapes: [`HostMessage`] flowing out of IRC and
//! [`OutboundRequest`] flowing into it. Both are addressed by an origin of
//! the form `<agent-name>/<channel-or-user>`.

/// Separator between the agent name and the channel or user in an origin.
pub const ORIGIN_SEPARATOR: char = '/';

/// The host side of the bridge.
///
/// `dispatch` is called from the connection's execution context, never from
/// the thread that called into the agent.
pub trait Host: Send + Sync + 'static {
    fn dispatch(&self, message: HostMessage);
}

/// A message relayed from IRC to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMessage {
    pub body: String,
    /// Sender's nickname.
    pub author: String,
    /// Services account name, when the sender is identified.
    pub identity: Option<String>,
    pub origin: String,
}

/// A message the host wants delivered to IRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub origin: String,
    pub body: String,
}

impl OutboundRequest {
    pub fn new(origin: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            body: body.into(),
        }
    }

    /// Channel or nick to deliver to: the origin's tail after the last separator.
    pub fn target(&self) -> &str {
        origin_target(&self.origin)
    }
}

/// Build `<agent>/<tail>`.
pub fn make_origin(agent: &str, tail: &str) -> String {
    let mut origin = String::with_capacity(agent.len() + 1 + tail.len());
    origin.push_str(agent);
    origin.push(ORIGIN_SEPARATOR);
    origin.push_str(tail);
    origin
}

/// Tail segment of an origin; an origin with no separator is its own target.
pub fn origin_target(origin: &str) -> &str {
    match origin.rfind(ORIGIN_SEPARATOR) {
        Some(pos) => &origin[pos + 1..],
        None => origin,
    }
}

/// Whether `target` names exactly one channel or nick on the wire.
///
/// Empty names, spaces and commas (target lists), a leading `:` and control
/// characters would change what the server reads as the target.
pub fn is_valid_target(target: &str) -> bool {
    !target.is_empty()
        && !target.starts_with(':')
        && !target.contains([' ', ',', '\r', '\n', '\0'])
}
