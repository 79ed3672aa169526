//! TCP/TLS connector producing registered [`IrcClient`]s.

use super::connection::{Connection, Connector, IrcClient, register};
use super::tls;
use crate::config::Config;
use crate::error::{ConnectionError, StartupError};
use async_trait::async_trait;
use ircbridge_proto::IrcCodec;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, info};

/// Connects to the configured server over TCP, optionally wrapped in TLS.
pub struct IrcConnector {
    tls: Option<TlsConnector>,
}

impl IrcConnector {
    /// Resolve TLS materials from the configuration.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        Ok(Self {
            tls: tls::build_connector(config)?,
        })
    }
}

#[async_trait]
impl Connector for IrcConnector {
    async fn connect(&self, config: &Config) -> Result<Box<dyn Connection>, ConnectionError> {
        let addr = config.address();
        let limit = config.timeouts.connect();
        info!(addr = %addr, tls = config.tls, "Connecting");

        let stream = timeout(limit, TcpStream::connect(&addr))
            .await
            .map_err(|_| ConnectionError::ConnectTimeout { addr: addr.clone() })??;
        stream.set_nodelay(true)?;
        debug!(addr = %addr, "TCP connected");

        match &self.tls {
            Some(connector) => {
                let name = tls::server_name(&config.hostname)?;
                let stream = timeout(limit, connector.connect(name, stream))
                    .await
                    .map_err(|_| ConnectionError::ConnectTimeout { addr: addr.clone() })?
                    .map_err(|e| ConnectionError::Tls(e.to_string()))?;
                debug!(addr = %addr, "TLS handshake complete");
                finish(stream, config).await
            }
            None => finish(stream, config).await,
        }
    }
}

/// Register over an established stream.
async fn finish<S>(stream: S, config: &Config) -> Result<Box<dyn Connection>, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut framed = Framed::new(stream, IrcCodec::new());
    let nick = register(&mut framed, config).await?;
    Ok(Box::new(IrcClient::new(
        framed,
        nick,
        config.timeouts.whois(),
    )))
}
