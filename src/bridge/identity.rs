//! Nickname → identification cache.
//!
//! Entries live as long as the connection and are dropped only on the
//! QUIT and NICK events the server reports. There is no expiry.

use crate::network::WhoisRecord;
use ircbridge_proto::irc_to_lower;
use std::collections::HashMap;

/// WHOIS results keyed by case-folded nickname.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: HashMap<String, WhoisRecord>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, nick: &str) -> Option<&WhoisRecord> {
        self.entries.get(&irc_to_lower(nick))
    }

    /// Store a complete WHOIS result, replacing any previous one.
    pub fn insert(&mut self, nick: &str, record: WhoisRecord) {
        self.entries.insert(irc_to_lower(nick), record);
    }

    /// Forget a nickname. Returns whether an entry was present.
    pub fn invalidate(&mut self, nick: &str) -> bool {
        self.entries.remove(&irc_to_lower(nick)).is_some()
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.entries.contains_key(&irc_to_lower(nick))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
