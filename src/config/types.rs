//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_agent_name, default_connect_timeout, default_hostname, default_nickname,
    default_port, default_realname, default_registration_timeout, default_shutdown_timeout,
    default_true, default_whois_timeout,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<super::validation::ValidationError>),
}

fn join_errors(errors: &[super::validation::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// IRC agent configuration.
///
/// Keys are kebab-case (`tls-verify`, `sasl-username`, ...). The whole
/// struct is immutable once a connection has been started from it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Agent name; the first segment of every message origin.
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Nickname to register with.
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// USER name; falls back to the nickname.
    #[serde(default)]
    pub username: Option<String>,
    /// USER realname.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server hostname.
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Server port (default: 6697).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Channel or channels to join once connected.
    pub channel: Channels,

    /// Connect over TLS (default: true).
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Verify the server certificate against the system roots (default: false).
    #[serde(default)]
    pub tls_verify: bool,
    /// PEM client certificate chain.
    #[serde(default)]
    pub tls_certificate_file: Option<String>,
    /// PEM private key for the client certificate.
    #[serde(default)]
    pub tls_certificate_keyfile: Option<String>,
    /// Password for an encrypted client key.
    #[serde(default)]
    pub tls_certificate_password: Option<String>,

    /// SASL PLAIN authentication identity.
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    /// SASL authorization identity (authzid).
    #[serde(default)]
    pub sasl_identity: Option<String>,

    /// Time limits for network operations.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// USER name sent at registration.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    /// `host:port` string for connecting and for logs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// SASL credentials, present only when both username and password are set.
    pub fn sasl(&self) -> Option<SaslCredentials<'_>> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(username), Some(password)) => Some(SaslCredentials {
                authzid: self.sasl_identity.as_deref().unwrap_or(""),
                authcid: username,
                password,
            }),
            _ => None,
        }
    }
}

/// Borrowed SASL PLAIN credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaslCredentials<'a> {
    pub authzid: &'a str,
    pub authcid: &'a str,
    pub password: &'a str,
}

/// One channel or an ordered list of channels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Channels {
    Single(String),
    Many(Vec<String>),
}

impl Channels {
    /// Channels in join order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Channels::Single(channel) => std::slice::from_ref(channel),
            Channels::Many(channels) => channels,
        };
        slice.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        match self {
            Channels::Single(_) => 1,
            Channels::Many(channels) => channels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Channels {
    fn from(channel: &str) -> Self {
        Channels::Single(channel.to_owned())
    }
}

impl From<Vec<&str>> for Channels {
    fn from(channels: Vec<&str>) -> Self {
        Channels::Many(channels.into_iter().map(str::to_owned).collect())
    }
}

/// Time limits, in seconds.
///
/// - `connect`: TCP connect plus TLS handshake (default: 30)
/// - `registration`: welcome (001) after NICK/USER, including SASL (default: 60)
/// - `whois`: wait for RPL_ENDOFWHOIS before treating the nick as unidentified (default: 30)
/// - `shutdown`: wait for the connection thread to exit on stop (default: 10)
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect: u64,
    #[serde(default = "default_registration_timeout")]
    pub registration: u64,
    #[serde(default = "default_whois_timeout")]
    pub whois: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect: default_connect_timeout(),
            registration: default_registration_timeout(),
            whois: default_whois_timeout(),
            shutdown: default_shutdown_timeout(),
        }
    }
}

impl TimeoutsConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect)
    }

    pub fn registration(&self) -> Duration {
        Duration::from_secs(self.registration)
    }

    pub fn whois(&self) -> Duration {
        Duration::from_secs(self.whois)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown)
    }
}
