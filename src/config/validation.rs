//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Channels, Config};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("nickname is required")]
    MissingNickname,
    #[error("nickname must not contain spaces, got '{0}'")]
    InvalidNickname(String),
    #[error("hostname is required")]
    MissingHostname,
    #[error("port must be non-zero")]
    InvalidPort,
    #[error("agent name must be non-empty and must not contain '/', got '{0}'")]
    InvalidAgentName(String),
    #[error("channel list is empty")]
    NoChannels,
    #[error("channel name is invalid: '{0}'")]
    InvalidChannel(String),
    #[error("{0} requires tls = true")]
    TlsOptionWithoutTls(&'static str),
    #[error("tls-certificate-keyfile requires tls-certificate-file")]
    KeyfileWithoutCertificate,
    #[error("tls-certificate-file does not exist: {0}")]
    TlsCertNotFound(String),
    #[error("tls-certificate-keyfile does not exist: {0}")]
    TlsKeyNotFound(String),
    #[error("{0} requires sasl-username")]
    SaslOptionWithoutUsername(&'static str),
    #[error("sasl-username requires sasl-password")]
    SaslMissingPassword,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Identity
    if config.nickname.is_empty() {
        errors.push(ValidationError::MissingNickname);
    } else if config.nickname.contains(' ') {
        errors.push(ValidationError::InvalidNickname(config.nickname.clone()));
    }
    if config.name.is_empty() || config.name.contains('/') {
        errors.push(ValidationError::InvalidAgentName(config.name.clone()));
    }

    // Server
    if config.hostname.is_empty() {
        errors.push(ValidationError::MissingHostname);
    }
    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    // Channels
    if matches!(config.channel, Channels::Many(ref list) if list.is_empty()) {
        errors.push(ValidationError::NoChannels);
    }
    for channel in config.channel.iter() {
        if channel.is_empty() || channel.contains([' ', ',', '\x07']) {
            errors.push(ValidationError::InvalidChannel(channel.to_string()));
        }
    }

    // TLS
    if !config.tls {
        if config.tls_verify {
            errors.push(ValidationError::TlsOptionWithoutTls("tls-verify"));
        }
        if config.tls_certificate_file.is_some() {
            errors.push(ValidationError::TlsOptionWithoutTls("tls-certificate-file"));
        }
    }
    if config.tls_certificate_keyfile.is_some() && config.tls_certificate_file.is_none() {
        errors.push(ValidationError::KeyfileWithoutCertificate);
    }
    if let Some(ref cert) = config.tls_certificate_file
        && !Path::new(cert).exists()
    {
        errors.push(ValidationError::TlsCertNotFound(cert.clone()));
    }
    if let Some(ref key) = config.tls_certificate_keyfile
        && !Path::new(key).exists()
    {
        errors.push(ValidationError::TlsKeyNotFound(key.clone()));
    }

    // SASL
    if config.sasl_username.is_none() {
        if config.sasl_password.is_some() {
            errors.push(ValidationError::SaslOptionWithoutUsername("sasl-password"));
        }
        if config.sasl_identity.is_some() {
            errors.push(ValidationError::SaslOptionWithoutUsername("sasl-identity"));
        }
    } else if config.sasl_password.is_none() {
        errors.push(ValidationError::SaslMissingPassword);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
