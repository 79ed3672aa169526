//! Integration test common infrastructure.
//!
//! Provides a scripted in-memory [`Connection`], a [`Connector`] handing it
//! to the supervisor, and a [`Host`] that records what it is given.

#![allow(dead_code)]

use async_trait::async_trait;
use ircbridge::config::Config;
use ircbridge::error::ConnectionError;
use ircbridge::host::{Host, HostMessage};
use ircbridge::network::{Connection, Connector, Event, WhoisRecord};
use ircbridge_proto::irc_to_lower;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Everything the mock connection was asked to do.
#[derive(Debug, Default)]
pub struct Recorded {
    pub joins: Vec<String>,
    pub sends: Vec<(String, String)>,
    pub whois: Vec<String>,
    /// WHOIS calls that ran to completion.
    pub whois_completed: usize,
    pub quits: Vec<Option<String>>,
    /// Set by `quit`; nothing may be recorded after it.
    pub closed: bool,
    /// Operations attempted after `closed` was set.
    pub after_close: usize,
}

/// How the mock answers a WHOIS for one nick.
#[derive(Debug, Clone)]
pub enum WhoisReply {
    Record(WhoisRecord),
    /// Answer only after the given delay.
    Slow(Duration, WhoisRecord),
    Fail,
}

/// Test-side handle onto a mock connection.
#[derive(Clone)]
pub struct MockNet {
    pub recorded: Arc<Mutex<Recorded>>,
    replies: Arc<Mutex<HashMap<String, WhoisReply>>>,
    events: mpsc::UnboundedSender<Event>,
}

impl MockNet {
    /// Deliver an inbound event to the connection.
    pub fn push(&self, event: Event) {
        self.events.send(event).expect("connection dropped");
    }

    pub fn set_whois(&self, nick: &str, reply: WhoisReply) {
        self.replies.lock().insert(irc_to_lower(nick), reply);
    }

    pub fn whois_count(&self, nick: &str) -> usize {
        self.recorded
            .lock()
            .whois
            .iter()
            .filter(|n| irc_to_lower(n) == irc_to_lower(nick))
            .count()
    }

    pub fn joins(&self) -> Vec<String> {
        self.recorded.lock().joins.clone()
    }

    pub fn sends(&self) -> Vec<(String, String)> {
        self.recorded.lock().sends.clone()
    }

    pub fn closed(&self) -> bool {
        self.recorded.lock().closed
    }
}

/// In-memory connection driven by a [`MockNet`].
pub struct MockConnection {
    nick: String,
    recorded: Arc<Mutex<Recorded>>,
    replies: Arc<Mutex<HashMap<String, WhoisReply>>>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl MockConnection {
    pub fn new(nick: &str) -> (Self, MockNet) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let replies = Arc::new(Mutex::new(HashMap::new()));
        let conn = Self {
            nick: nick.to_string(),
            recorded: Arc::clone(&recorded),
            replies: Arc::clone(&replies),
            events: rx,
        };
        let net = MockNet {
            recorded,
            replies,
            events: tx,
        };
        (conn, net)
    }

    fn record(&self, f: impl FnOnce(&mut Recorded)) {
        let mut recorded = self.recorded.lock();
        if recorded.closed {
            recorded.after_close += 1;
        }
        f(&mut recorded);
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn nickname(&self) -> &str {
        &self.nick
    }

    async fn next_event(&mut self) -> Result<Option<Event>, ConnectionError> {
        Ok(self.events.recv().await)
    }

    async fn join(&mut self, channel: &str) -> Result<(), ConnectionError> {
        self.record(|r| r.joins.push(channel.to_string()));
        Ok(())
    }

    async fn send(&mut self, target: &str, text: &str) -> Result<(), ConnectionError> {
        self.record(|r| r.sends.push((target.to_string(), text.to_string())));
        Ok(())
    }

    async fn whois(&mut self, nick: &str) -> Result<WhoisRecord, ConnectionError> {
        self.record(|r| r.whois.push(nick.to_string()));
        let reply = self.replies.lock().get(&irc_to_lower(nick)).cloned();
        let result = match reply {
            Some(WhoisReply::Record(record)) => Ok(record),
            Some(WhoisReply::Slow(delay, record)) => {
                tokio::time::sleep(delay).await;
                Ok(record)
            }
            Some(WhoisReply::Fail) => Err(ConnectionError::WhoisTimeout(nick.to_string())),
            None => Ok(WhoisRecord::unidentified()),
        };
        self.record(|r| r.whois_completed += 1);
        result
    }

    async fn quit(&mut self, reason: Option<&str>) -> Result<(), ConnectionError> {
        // Let the runtime run other work before the flag flips.
        tokio::task::yield_now().await;
        self.record(|r| {
            r.quits.push(reason.map(str::to_string));
            r.closed = true;
        });
        Ok(())
    }
}

/// Hands out one prepared [`MockConnection`], or fails.
pub struct MockConnector {
    conn: Mutex<Option<MockConnection>>,
    delay: Duration,
}

impl MockConnector {
    pub fn new(nick: &str) -> (Self, MockNet) {
        let (conn, net) = MockConnection::new(nick);
        let connector = Self {
            conn: Mutex::new(Some(conn)),
            delay: Duration::ZERO,
        };
        (connector, net)
    }

    /// Connect only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// A connector whose connect always fails.
    pub fn refusing() -> Self {
        Self {
            conn: Mutex::new(None),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _config: &Config) -> Result<Box<dyn Connection>, ConnectionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.conn.lock().take() {
            Some(conn) => Ok(Box::new(conn)),
            None => Err(ConnectionError::Other("connection refused".into())),
        }
    }
}

/// Host that keeps every dispatched message.
#[derive(Default)]
pub struct RecordingHost {
    messages: Mutex<Vec<HostMessage>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.lock().clone()
    }

    /// Wait until at least `n` messages arrived.
    pub fn wait_for(&self, n: usize) -> Vec<HostMessage> {
        assert!(
            wait_until(|| self.messages.lock().len() >= n),
            "expected {} dispatched messages, got {:?}",
            n,
            self.messages()
        );
        self.messages()
    }
}

impl Host for RecordingHost {
    fn dispatch(&self, message: HostMessage) {
        self.messages.lock().push(message);
    }
}

/// Minimal plaintext config for tests.
pub fn test_config(channel: &str) -> Config {
    toml::from_str(&format!(
        r#"
        nickname = "bridge"
        hostname = "127.0.0.1"
        port = 6667
        channel = {channel}
        tls = false

        [timeouts]
        whois = 1
        shutdown = 5
        "#
    ))
    .expect("test config")
}

/// Poll `cond` for up to five seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}
