//! TLS client configuration.
//!
//! Materials are resolved once, at agent startup, so that a missing or
//! unreadable certificate fails `init` instead of a later connection attempt.

use crate::config::Config;
use crate::error::StartupError;
use rustls_pemfile::{certs, private_key};
use std::io::{BufReader, Cursor};
use std::sync::Arc;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::warn;

/// Build a TLS connector from the agent configuration, or `None` for plaintext.
pub fn build_connector(config: &Config) -> Result<Option<TlsConnector>, StartupError> {
    if !config.tls {
        return Ok(None);
    }

    let builder = if config.tls_verify {
        ClientConfig::builder().with_root_certificates(native_roots())
    } else {
        // Dangerous: accepts any server certificate, matching the default of tls-verify = false
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousNoVerifier))
    };

    let client_config = match load_client_identity(config)? {
        Some((chain, key)) => builder
            .with_client_auth_cert(chain, key)
            .map_err(|e| StartupError::Tls(e.to_string()))?,
        None => builder.with_no_client_auth(),
    };

    Ok(Some(TlsConnector::from(Arc::new(client_config))))
}

/// Server name for SNI and verification.
pub fn server_name(hostname: &str) -> Result<ServerName<'static>, crate::error::ConnectionError> {
    ServerName::try_from(hostname.to_string())
        .map_err(|e| crate::error::ConnectionError::Tls(e.to_string()))
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }
    roots
}

type ClientIdentity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

fn load_client_identity(config: &Config) -> Result<Option<ClientIdentity>, StartupError> {
    let Some(ref cert_path) = config.tls_certificate_file else {
        return Ok(None);
    };

    if config.tls_certificate_password.is_some() {
        return Err(StartupError::Tls(
            "encrypted client keys are not supported; decrypt the key file instead".to_string(),
        ));
    }

    let cert_file = std::fs::read(cert_path)
        .map_err(|e| StartupError::Tls(format!("{}: {}", cert_path, e)))?;
    let chain: Vec<CertificateDer<'static>> = certs(&mut BufReader::new(Cursor::new(&cert_file)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StartupError::Tls(format!("{}: {}", cert_path, e)))?;
    if chain.is_empty() {
        return Err(StartupError::Tls(format!("no certificates found in {}", cert_path)));
    }

    // The key may live in the certificate file itself.
    let key_path = config
        .tls_certificate_keyfile
        .as_deref()
        .unwrap_or(cert_path.as_str());
    let key_file = std::fs::read(key_path)
        .map_err(|e| StartupError::Tls(format!("{}: {}", key_path, e)))?;
    let key = private_key(&mut BufReader::new(Cursor::new(&key_file)))
        .map_err(|e| StartupError::Tls(format!("{}: {}", key_path, e)))?
        .ok_or_else(|| StartupError::Tls(format!("no private key found in {}", key_path)))?;

    Ok(Some((chain, key)))
}

/// Certificate verifier that accepts everything.
#[derive(Debug)]
struct DangerousNoVerifier;

impl ServerCertVerifier for DangerousNoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        tokio_rustls::rustls::crypto::CryptoProvider::get_default()
            .map(|provider| {
                provider
                    .signature_verification_algorithms
                    .supported_schemes()
            })
            .unwrap_or_else(|| {
                vec![
                    SignatureScheme::ECDSA_NISTP256_SHA256,
                    SignatureScheme::ECDSA_NISTP384_SHA384,
                    SignatureScheme::ED25519,
                    SignatureScheme::RSA_PSS_SHA256,
                    SignatureScheme::RSA_PSS_SHA384,
                    SignatureScheme::RSA_PSS_SHA512,
                    SignatureScheme::RSA_PKCS1_SHA256,
                    SignatureScheme::RSA_PKCS1_SHA384,
                    SignatureScheme::RSA_PKCS1_SHA512,
                ]
            })
    }
}
