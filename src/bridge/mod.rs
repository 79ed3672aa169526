//! Bridge Adapter - translates IRC events into host messages.
//!
//! Runs inside the supervisor's execution context as its [`EventHandler`],
//! so the identity cache has exactly one writer and needs no lock.

mod identity;

pub use identity::IdentityCache;

use crate::config::Channels;
use crate::host::{Host, HostMessage, make_origin};
use crate::network::{Connection, Event};
use crate::supervisor::EventHandler;
use async_trait::async_trait;
use ircbridge_proto::irc_eq;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event translation and identity resolution for one connection.
pub struct Bridge {
    agent_name: String,
    channels: Channels,
    cache: IdentityCache,
    host: Arc<dyn Host>,
}

impl Bridge {
    pub fn new(agent_name: impl Into<String>, channels: Channels, host: Arc<dyn Host>) -> Self {
        Self {
            agent_name: agent_name.into(),
            channels,
            cache: IdentityCache::new(),
            host,
        }
    }

    /// Read access to the cache, for inspection in tests and logs.
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Join every configured channel, continuing past individual failures.
    pub async fn join_channels(&self, conn: &mut dyn Connection) {
        match &self.channels {
            Channels::Single(channel) => join_one(conn, channel).await,
            Channels::Many(channels) => {
                for channel in channels {
                    join_one(conn, channel).await;
                }
            }
        }
    }

    pub async fn on_channel_message(
        &mut self,
        conn: &mut dyn Connection,
        target: &str,
        author: &str,
        text: String,
    ) {
        let origin = make_origin(&self.agent_name, target);
        self.relay(conn, origin, author, text).await;
    }

    pub async fn on_private_message(&mut self, conn: &mut dyn Connection, author: &str, text: String) {
        let origin = make_origin(&self.agent_name, author);
        self.relay(conn, origin, author, text).await;
    }

    pub fn on_user_quit(&mut self, nick: &str) {
        if self.cache.invalidate(nick) {
            debug!(nick = %nick, "Dropped cached identity on quit");
        }
    }

    /// Both nicks are dropped: the new one may have belonged to someone else.
    pub fn on_nick_change(&mut self, old: &str, new: &str) {
        self.cache.invalidate(old);
        self.cache.invalidate(new);
        debug!(old = %old, new = %new, "Dropped cached identities on nick change");
    }

    /// Resolve a nick to its services account, querying WHOIS on a cache miss.
    ///
    /// A failed or timed-out WHOIS yields `None` and leaves the cache untouched,
    /// so the next lookup tries again.
    pub async fn identity(&mut self, conn: &mut dyn Connection, nick: &str) -> Option<String> {
        if let Some(record) = self.cache.get(nick) {
            return record.identified.then(|| record.account.clone()).flatten();
        }

        let record = match conn.whois(nick).await {
            Ok(record) => record,
            Err(e) => {
                warn!(nick = %nick, error = %e, kind = e.error_code(), "WHOIS failed");
                return None;
            }
        };

        let account = record.identified.then(|| record.account.clone()).flatten();
        self.cache.insert(nick, record);
        account
    }

    async fn relay(&mut self, conn: &mut dyn Connection, origin: String, author: &str, body: String) {
        if irc_eq(author, conn.nickname()) {
            return;
        }

        let identity = self.identity(conn, author).await;
        self.host.dispatch(HostMessage {
            body,
            author: author.to_string(),
            identity,
            origin,
        });
    }
}

async fn join_one(conn: &mut dyn Connection, channel: &str) {
    match conn.join(channel).await {
        Ok(()) => info!(channel = %channel, "Joining channel"),
        Err(e) => warn!(channel = %channel, error = %e, "JOIN failed"),
    }
}

#[async_trait]
impl EventHandler for Bridge {
    async fn on_connected(&mut self, conn: &mut dyn Connection) {
        info!(nick = %conn.nickname(), channels = self.channels.len(), "Connected");
        self.join_channels(conn).await;
    }

    async fn on_event(&mut self, conn: &mut dyn Connection, event: Event) {
        match event {
            Event::ChannelMessage { target, author, text } => {
                self.on_channel_message(conn, &target, &author, text).await
            }
            Event::PrivateMessage { author, text } => {
                self.on_private_message(conn, &author, text).await
            }
            Event::Quit { nick } => self.on_user_quit(&nick),
            Event::NickChange { old, new } => self.on_nick_change(&old, &new),
            Event::JoinFailed { channel, reason } => {
                warn!(channel = %channel, reason = %reason, "Could not join channel")
            }
        }
    }
}
