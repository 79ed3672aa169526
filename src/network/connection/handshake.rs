//! Registration handshake: optional SASL PLAIN, NICK/USER, wait for 001.

use crate::config::Config;
use crate::error::ConnectionError;
use futures_util::{SinkExt, StreamExt};
use ircbridge_proto::response::{
    ERR_ERRONEUSNICKNAME, ERR_NICKNAMEINUSE, RPL_LOGGEDIN, RPL_SASLSUCCESS, RPL_WELCOME,
    SASL_FAILURES,
};
use ircbridge_proto::{IrcCodec, Message, sasl};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// NICK attempts, the configured one included, before giving up on collisions.
const MAX_NICK_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaslPhase {
    /// No SASL configured, or already finished.
    Done,
    /// `CAP REQ :sasl` sent.
    Requested,
    /// `AUTHENTICATE PLAIN` sent.
    Mechanism,
    /// Credentials sent, waiting for 903.
    Credentials,
}

/// Register on the server and return the nickname it accepted.
///
/// The whole exchange is bounded by `timeouts.registration`.
pub async fn register<S>(
    framed: &mut Framed<S, IrcCodec>,
    config: &Config,
) -> Result<String, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let limit = config.timeouts.registration();
    tokio::time::timeout(limit, run_handshake(framed, config))
        .await
        .map_err(|_| ConnectionError::RegistrationTimeout)?
}

async fn run_handshake<S>(
    framed: &mut Framed<S, IrcCodec>,
    config: &Config,
) -> Result<String, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let sasl = config.sasl();
    let mut phase = SaslPhase::Done;
    let mut nick = config.nickname.clone();
    let mut nick_attempts = 1;

    if sasl.is_some() {
        framed.send(Message::cap_req("sasl")).await?;
        phase = SaslPhase::Requested;
    }
    framed.send(Message::nick(&nick)).await?;
    framed
        .send(Message::user(config.username(), &config.realname))
        .await?;

    while let Some(msg) = framed.next().await {
        let msg = msg?;

        match msg.command.as_str() {
            "PING" => {
                framed.send(Message::pong(msg.param(0).unwrap_or(""))).await?;
                continue;
            }
            "ERROR" => {
                let reason = msg.param(0).unwrap_or("closing link").to_string();
                return Err(ConnectionError::RegistrationRejected(reason));
            }
            "CAP" if phase == SaslPhase::Requested => {
                match msg.param(1) {
                    Some("ACK") => {
                        framed.send(Message::authenticate("PLAIN")).await?;
                        phase = SaslPhase::Mechanism;
                    }
                    Some("NAK") => {
                        return Err(ConnectionError::SaslFailed(
                            "server does not offer sasl".to_string(),
                        ));
                    }
                    _ => {}
                }
                continue;
            }
            "AUTHENTICATE" if phase == SaslPhase::Mechanism => {
                if let Some(creds) = sasl {
                    let encoded = sasl::encode_plain(creds.authzid, creds.authcid, creds.password);
                    for chunk in sasl::chunk_payload(&encoded) {
                        framed.send(Message::authenticate(&chunk)).await?;
                    }
                }
                phase = SaslPhase::Credentials;
                continue;
            }
            _ => {}
        }

        let Some(code) = msg.numeric() else {
            continue;
        };

        match code {
            RPL_WELCOME if phase != SaslPhase::Done => {
                // The server registered us without finishing (or starting) SASL.
                return Err(ConnectionError::SaslFailed(
                    "server completed registration before authentication".to_string(),
                ));
            }
            RPL_WELCOME => {
                let accepted = msg.param(0).unwrap_or(&nick).to_string();
                info!(nick = %accepted, "Registered with server");
                return Ok(accepted);
            }
            RPL_LOGGEDIN => {
                debug!(account = ?msg.param(2), "SASL logged in");
            }
            RPL_SASLSUCCESS => {
                info!("SASL authentication succeeded");
                framed.send(Message::cap_end()).await?;
                phase = SaslPhase::Done;
            }
            code if SASL_FAILURES.contains(&code) && phase != SaslPhase::Done => {
                let reason = msg.params.last().cloned().unwrap_or_default();
                return Err(ConnectionError::SaslFailed(reason));
            }
            ERR_NICKNAMEINUSE => {
                if nick_attempts >= MAX_NICK_ATTEMPTS {
                    return Err(ConnectionError::RegistrationRejected(format!(
                        "nickname {} in use",
                        nick
                    )));
                }
                nick.push('_');
                nick_attempts += 1;
                warn!(nick = %nick, "Nickname in use, retrying");
                framed.send(Message::nick(&nick)).await?;
            }
            ERR_ERRONEUSNICKNAME => {
                return Err(ConnectionError::RegistrationRejected(format!(
                    "erroneous nickname {}",
                    nick
                )));
            }
            _ => {}
        }
    }

    Err(ConnectionError::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn config(extra: &str) -> Config {
        toml::from_str(&format!("nickname = \"bridge\"\nchannel = \"#foo\"\n{}", extra)).unwrap()
    }

    #[tokio::test]
    async fn test_plain_registration() {
        let (client, server) = tokio::io::duplex(4096);
        let mut framed = Framed::new(client, IrcCodec::new());
        let cfg = config("");

        let server_task = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            let nick = lines.next_line().await.unwrap().unwrap();
            let user = lines.next_line().await.unwrap().unwrap();
            write.write_all(b":srv 001 bridge :Welcome\r\n").await.unwrap();
            (nick, user)
        });

        let accepted = register(&mut framed, &cfg).await.unwrap();
        assert_eq!(accepted, "bridge");

        let (nick, user) = server_task.await.unwrap();
        assert_eq!(nick, "NICK bridge");
        assert_eq!(user, "USER bridge 0 * :ircbridge relay agent");
    }

    #[tokio::test]
    async fn test_nick_collision_appends_underscore() {
        let (client, server) = tokio::io::duplex(4096);
        let mut framed = Framed::new(client, IrcCodec::new());
        let cfg = config("");

        let server_task = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            lines.next_line().await.unwrap();
            lines.next_line().await.unwrap();
            write
                .write_all(b":srv 433 * bridge :Nickname is already in use\r\n")
                .await
                .unwrap();
            let retry = lines.next_line().await.unwrap().unwrap();
            write.write_all(b":srv 001 bridge_ :Welcome\r\n").await.unwrap();
            retry
        });

        let accepted = register(&mut framed, &cfg).await.unwrap();
        assert_eq!(accepted, "bridge_");
        assert_eq!(server_task.await.unwrap(), "NICK bridge_");
    }

    #[tokio::test]
    async fn test_sasl_failure_is_an_error() {
        let (client, server) = tokio::io::duplex(4096);
        let mut framed = Framed::new(client, IrcCodec::new());
        let cfg = config("sasl-username = \"bridge\"\nsasl-password = \"wrong\"");

        tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            assert_eq!(lines.next_line().await.unwrap().unwrap(), "CAP REQ sasl");
            lines.next_line().await.unwrap();
            lines.next_line().await.unwrap();
            write.write_all(b":srv CAP * ACK :sasl\r\n").await.unwrap();
            assert_eq!(lines.next_line().await.unwrap().unwrap(), "AUTHENTICATE PLAIN");
            write.write_all(b"AUTHENTICATE +\r\n").await.unwrap();
            lines.next_line().await.unwrap();
            write
                .write_all(b":srv 904 * :SASL authentication failed\r\n")
                .await
                .unwrap();
            // Keep the stream open until the client gives up.
            let _ = lines.next_line().await;
        });

        let err = register(&mut framed, &cfg).await.unwrap_err();
        assert!(matches!(err, ConnectionError::SaslFailed(_)));
    }

    #[tokio::test]
    async fn test_sasl_ignored_by_server_is_an_error() {
        let (client, server) = tokio::io::duplex(4096);
        let mut framed = Framed::new(client, IrcCodec::new());
        let cfg = config("sasl-username = \"bridge\"\nsasl-password = \"secret\"");

        tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            assert_eq!(lines.next_line().await.unwrap().unwrap(), "CAP REQ sasl");
            lines.next_line().await.unwrap();
            lines.next_line().await.unwrap();
            write
                .write_all(b":srv 421 * CAP :Unknown command\r\n:srv 001 bridge :Welcome\r\n")
                .await
                .unwrap();
            let _ = lines.next_line().await;
        });

        let err = register(&mut framed, &cfg).await.unwrap_err();
        assert!(matches!(err, ConnectionError::SaslFailed(_)));
    }

    #[tokio::test]
    async fn test_closed_before_welcome() {
        let (client, server) = tokio::io::duplex(4096);
        let mut framed = Framed::new(client, IrcCodec::new());
        drop(server);

        let err = register(&mut framed, &config("")).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Closed | ConnectionError::Io(_) | ConnectionError::Protocol(_)));
    }
}
