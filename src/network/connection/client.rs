//! The framed IRC client behind [`Connection`].

use super::{Connection, Event, WhoisRecord};
use crate::error::ConnectionError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use ircbridge_proto::response::{
    ERR_NOSUCHNICK, JOIN_FAILURES, RPL_ENDOFWHOIS, RPL_WHOISACCOUNT, RPL_WHOISREGNICK,
};
use ircbridge_proto::{IrcCodec, Message, irc_eq, irc_to_lower};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

const CTCP_DELIM: char = '\x01';
const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// A registered client over any byte stream.
pub struct IrcClient<S> {
    framed: Framed<S, IrcCodec>,
    nick: String,
    whois_timeout: Duration,
    /// Events read while a WHOIS was waiting for its reply.
    pending: VecDeque<Event>,
    /// Folded nicks whose timed-out WHOIS still owes an RPL_ENDOFWHOIS.
    abandoned: Vec<String>,
}

impl<S> IrcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-registered stream.
    pub fn new(framed: Framed<S, IrcCodec>, nick: String, whois_timeout: Duration) -> Self {
        Self {
            framed,
            nick,
            whois_timeout,
            pending: VecDeque::new(),
            abandoned: Vec::new(),
        }
    }

    /// Consume the end of an abandoned WHOIS. Returns whether `nick` had one.
    fn settle_abandoned(&mut self, nick: &str) -> bool {
        let folded = irc_to_lower(nick);
        match self.abandoned.iter().position(|n| *n == folded) {
            Some(pos) => {
                self.abandoned.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    fn is_abandoned(&self, nick: &str) -> bool {
        let folded = irc_to_lower(nick);
        self.abandoned.iter().any(|n| *n == folded)
    }

    /// Answer PINGs and turn a raw message into an event, if it is one.
    async fn process(&mut self, msg: Message) -> Result<Option<Event>, ConnectionError> {
        if msg.command == "PING" {
            self.framed
                .send(Message::pong(msg.param(0).unwrap_or("")))
                .await?;
            return Ok(None);
        }
        if msg.numeric() == Some(RPL_ENDOFWHOIS)
            && let Some(nick) = msg.param(1)
            && self.settle_abandoned(nick)
        {
            debug!(nick = %nick, "Late end of WHOIS discarded");
            return Ok(None);
        }
        if msg.command == "ERROR" {
            warn!(reason = ?msg.param(0), "Server closed link");
            return Ok(None);
        }
        if msg.command == "NICK"
            && let (Some(old), Some(new)) = (msg.source_nickname(), msg.param(0))
            && irc_eq(old, &self.nick)
        {
            debug!(old = %old, new = %new, "Own nickname changed");
            self.nick = new.to_string();
        }
        Ok(classify(&msg, &self.nick))
    }

    async fn read_whois(&mut self, nick: &str) -> Result<WhoisRecord, ConnectionError> {
        let mut record = WhoisRecord::unidentified();

        while let Some(msg) = self.framed.next().await {
            let msg = msg?;
            let code = msg.numeric();
            let about_nick = msg.param(1).is_some_and(|n| irc_eq(n, nick));

            // Replies still belonging to an earlier, timed-out query.
            if about_nick && self.is_abandoned(nick) {
                if code == Some(RPL_ENDOFWHOIS) {
                    self.settle_abandoned(nick);
                    record = WhoisRecord::unidentified();
                }
                continue;
            }

            match code {
                Some(RPL_WHOISACCOUNT) if about_nick => {
                    record.identified = true;
                    record.account = msg.param(2).map(str::to_string);
                }
                Some(RPL_WHOISREGNICK) if about_nick => {
                    record.identified = true;
                }
                Some(ERR_NOSUCHNICK) if about_nick => {
                    record = WhoisRecord::unidentified();
                }
                Some(RPL_ENDOFWHOIS) if about_nick => return Ok(record),
                _ => {
                    if let Some(event) = self.process(msg).await? {
                        self.pending.push_back(event);
                    }
                }
            }
        }

        Err(ConnectionError::Closed)
    }
}

#[async_trait]
impl<S> Connection for IrcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn nickname(&self) -> &str {
        &self.nick
    }

    async fn next_event(&mut self) -> Result<Option<Event>, ConnectionError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        while let Some(msg) = self.framed.next().await {
            let msg = msg?;
            trace!(line = %msg, "recv");
            if let Some(event) = self.process(msg).await? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    async fn join(&mut self, channel: &str) -> Result<(), ConnectionError> {
        self.framed.send(Message::join(channel)).await?;
        Ok(())
    }

    async fn send(&mut self, target: &str, text: &str) -> Result<(), ConnectionError> {
        for line in text.lines().filter(|line| !line.is_empty()) {
            self.framed.feed(Message::privmsg(target, line)).await?;
        }
        self.framed.flush().await?;
        Ok(())
    }

    async fn whois(&mut self, nick: &str) -> Result<WhoisRecord, ConnectionError> {
        self.framed.send(Message::whois(nick)).await?;

        // Events read before the timeout fires stay in `pending`.
        match tokio::time::timeout(self.whois_timeout, self.read_whois(nick)).await {
            Ok(result) => result,
            Err(_) => {
                self.abandoned.push(irc_to_lower(nick));
                Err(ConnectionError::WhoisTimeout(nick.to_string()))
            }
        }
    }

    async fn quit(&mut self, reason: Option<&str>) -> Result<(), ConnectionError> {
        self.framed.send(Message::quit(reason)).await?;
        self.framed.close().await?;
        Ok(())
    }
}

/// Map a server message onto a bridge event.
fn classify(msg: &Message, own_nick: &str) -> Option<Event> {
    if let Some(code) = msg.numeric() {
        if JOIN_FAILURES.contains(&code) {
            return Some(Event::JoinFailed {
                channel: msg.param(1)?.to_string(),
                reason: msg.params.last()?.to_string(),
            });
        }
        return None;
    }

    let source = msg.source_nickname();
    match msg.command.as_str() {
        "PRIVMSG" => {
            let author = source?.to_string();
            let target = msg.param(0)?;
            let text = plain_text(&author, msg.param(1)?)?;

            if target.starts_with(CHANNEL_PREFIXES) {
                Some(Event::ChannelMessage {
                    target: target.to_string(),
                    author,
                    text,
                })
            } else if irc_eq(target, own_nick) {
                Some(Event::PrivateMessage { author, text })
            } else {
                trace!(target = %target, "PRIVMSG for another target");
                None
            }
        }
        "QUIT" => Some(Event::Quit {
            nick: source?.to_string(),
        }),
        "NICK" => Some(Event::NickChange {
            old: source?.to_string(),
            new: msg.param(0)?.to_string(),
        }),
        _ => None,
    }
}

/// Strip CTCP framing: ACTION becomes `* nick text`, other CTCP is dropped.
fn plain_text(author: &str, text: &str) -> Option<String> {
    let Some(inner) = text.strip_prefix(CTCP_DELIM) else {
        return Some(text.to_string());
    };
    let inner = inner.strip_suffix(CTCP_DELIM).unwrap_or(inner);

    match inner.split_once(' ') {
        Some(("ACTION", action)) => Some(format!("* {} {}", author, action)),
        _ => {
            debug!(from = %author, ctcp = %inner, "Ignoring CTCP");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

    fn parse(line: &str) -> Message {
        line.parse().unwrap()
    }

    struct Server {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        write: WriteHalf<DuplexStream>,
    }

    impl Server {
        async fn send(&mut self, lines: &[&str]) {
            for line in lines {
                self.write.write_all(line.as_bytes()).await.unwrap();
                self.write.write_all(b"\r\n").await.unwrap();
            }
        }

        async fn recv(&mut self) -> String {
            self.lines.next_line().await.unwrap().unwrap()
        }
    }

    fn connected(whois_timeout: Duration) -> (IrcClient<DuplexStream>, Server) {
        let (client, server) = tokio::io::duplex(8192);
        let (read, write) = tokio::io::split(server);
        let client = IrcClient::new(
            Framed::new(client, IrcCodec::new()),
            "bridge".to_string(),
            whois_timeout,
        );
        let server = Server {
            lines: BufReader::new(read).lines(),
            write,
        };
        (client, server)
    }

    #[tokio::test]
    async fn test_whois_with_account() {
        let (mut client, mut server) = connected(Duration::from_secs(5));
        server
            .send(&[
                ":srv 311 bridge alice a host * :Alice",
                ":srv 330 bridge alice alice_ :is logged in as",
                ":srv 318 bridge alice :End of /WHOIS list.",
            ])
            .await;

        let record = client.whois("alice").await.unwrap();
        assert_eq!(record, WhoisRecord::identified("alice_"));
        assert_eq!(server.recv().await, "WHOIS alice");
    }

    #[tokio::test]
    async fn test_whois_regnick_only() {
        let (mut client, mut server) = connected(Duration::from_secs(5));
        server
            .send(&[
                ":srv 307 bridge alice :has identified for this nick",
                ":srv 318 bridge alice :End of /WHOIS list.",
            ])
            .await;

        let record = client.whois("alice").await.unwrap();
        assert!(record.identified);
        assert_eq!(record.account, None);
    }

    #[tokio::test]
    async fn test_whois_no_such_nick() {
        let (mut client, mut server) = connected(Duration::from_secs(5));
        server
            .send(&[
                ":srv 401 bridge ghost :No such nick/channel",
                ":srv 318 bridge ghost :End of /WHOIS list.",
                ":alice!a@h PRIVMSG #foo :after",
            ])
            .await;

        assert_eq!(client.whois("ghost").await.unwrap(), WhoisRecord::unidentified());
        // The trailing 318 was consumed by the query, not left for the next read.
        assert_eq!(
            client.next_event().await.unwrap(),
            Some(Event::ChannelMessage {
                target: "#foo".into(),
                author: "alice".into(),
                text: "after".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_events_during_whois_are_kept_in_order() {
        let (mut client, mut server) = connected(Duration::from_secs(5));
        server
            .send(&[
                ":bob!b@h PRIVMSG #foo :one",
                "PING :keepalive",
                ":srv 311 bridge alice a host * :Alice",
                ":carol!c@h QUIT :bye",
                ":srv 330 bridge alice alice_ :is logged in as",
                ":srv 318 bridge alice :End of /WHOIS list.",
            ])
            .await;

        let record = client.whois("alice").await.unwrap();
        assert_eq!(record.account.as_deref(), Some("alice_"));
        assert_eq!(server.recv().await, "WHOIS alice");
        assert_eq!(server.recv().await, "PONG keepalive");

        assert_eq!(
            client.next_event().await.unwrap(),
            Some(Event::ChannelMessage {
                target: "#foo".into(),
                author: "bob".into(),
                text: "one".into(),
            })
        );
        assert_eq!(
            client.next_event().await.unwrap(),
            Some(Event::Quit { nick: "carol".into() })
        );
    }

    #[tokio::test]
    async fn test_whois_timeout() {
        let (mut client, _server) = connected(Duration::from_millis(100));

        let err = client.whois("alice").await.unwrap_err();
        assert!(matches!(err, ConnectionError::WhoisTimeout(nick) if nick == "alice"));
    }

    #[tokio::test]
    async fn test_late_reply_not_taken_for_next_whois() {
        let (mut client, mut server) = connected(Duration::from_millis(200));
        server
            .send(&[
                ":srv 311 bridge alice a host * :Alice",
                ":srv 330 bridge alice alice_ :is logged in as",
            ])
            .await;
        assert!(client.whois("alice").await.is_err());

        // End of the first query arrives late, followed by the real answer.
        server
            .send(&[
                ":srv 318 bridge alice :End of /WHOIS list.",
                ":srv 311 bridge alice a host * :Alice",
                ":srv 330 bridge alice alice_ :is logged in as",
                ":srv 318 bridge alice :End of /WHOIS list.",
            ])
            .await;
        let record = client.whois("alice").await.unwrap();
        assert_eq!(record, WhoisRecord::identified("alice_"));
    }

    #[tokio::test]
    async fn test_late_end_of_whois_outside_query_is_dropped() {
        let (mut client, mut server) = connected(Duration::from_millis(100));
        assert!(client.whois("alice").await.is_err());

        server
            .send(&[
                ":srv 330 bridge alice alice_ :is logged in as",
                ":srv 318 bridge alice :End of /WHOIS list.",
                ":bob!b@h PRIVMSG #foo :hi",
            ])
            .await;
        assert!(matches!(
            client.next_event().await.unwrap(),
            Some(Event::ChannelMessage { .. })
        ));

        // Nothing left owing: the next reply is taken at face value.
        server
            .send(&[
                ":srv 307 bridge alice :has identified for this nick",
                ":srv 318 bridge alice :End of /WHOIS list.",
            ])
            .await;
        assert!(client.whois("alice").await.unwrap().identified);
    }

    #[test]
    fn test_classify_channel_message() {
        let event = classify(&parse(":alice!a@h PRIVMSG #foo :hello"), "bridge");
        assert_eq!(
            event,
            Some(Event::ChannelMessage {
                target: "#foo".into(),
                author: "alice".into(),
                text: "hello".into(),
            })
        );
    }

    #[test]
    fn test_classify_private_message() {
        let event = classify(&parse(":alice!a@h PRIVMSG Bridge :psst"), "bridge");
        assert_eq!(
            event,
            Some(Event::PrivateMessage {
                author: "alice".into(),
                text: "psst".into(),
            })
        );
    }

    #[test]
    fn test_classify_quit_and_nick() {
        assert_eq!(
            classify(&parse(":alice!a@h QUIT :bye"), "bridge"),
            Some(Event::Quit { nick: "alice".into() })
        );
        assert_eq!(
            classify(&parse(":alice!a@h NICK :alice2"), "bridge"),
            Some(Event::NickChange {
                old: "alice".into(),
                new: "alice2".into(),
            })
        );
    }

    #[test]
    fn test_classify_join_failure() {
        let event = classify(&parse(":srv 473 bridge #secret :Cannot join channel (+i)"), "bridge");
        assert_eq!(
            event,
            Some(Event::JoinFailed {
                channel: "#secret".into(),
                reason: "Cannot join channel (+i)".into(),
            })
        );
    }

    #[test]
    fn test_classify_ignores_server_privmsg_and_other_numerics() {
        assert_eq!(classify(&parse(":irc.test PRIVMSG #foo :motd"), "bridge"), None);
        assert_eq!(classify(&parse(":srv 372 bridge :- motd"), "bridge"), None);
    }

    #[test]
    fn test_ctcp_action_and_version() {
        assert_eq!(
            plain_text("alice", "\x01ACTION waves\x01"),
            Some("* alice waves".to_string())
        );
        assert_eq!(plain_text("alice", "\x01VERSION\x01"), None);
    }
}
