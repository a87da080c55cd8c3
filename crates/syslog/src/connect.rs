//! Connection strategy
//!
//! A sink dials its collector lazily, on the first message after startup
//! or after a failure. The strategy is fixed at sink construction: plain
//! TCP, or TCP plus a TLS handshake driven by the sink's TLS settings.
//!
//! Trust material is re-read from disk on every TLS attempt, so an
//! operator can fix a bad root-CA bundle without restarting the plugin.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

/// TLS settings for a sink, straight from its JSON descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsSettings {
    /// Skip server certificate verification
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Path to a PEM bundle used as the only trust anchors; empty means
    /// the bundled web PKI roots
    #[serde(default)]
    pub root_ca: String,
}

/// How a sink reaches its collector.
#[derive(Debug, Clone)]
pub(crate) enum Strategy {
    Tcp {
        dial_timeout: Duration,
    },
    Tls {
        dial_timeout: Duration,
        insecure_skip_verify: bool,
        root_ca: Option<PathBuf>,
    },
}

impl Strategy {
    pub(crate) fn new(tls: Option<&TlsSettings>, dial_timeout: Duration) -> Self {
        match tls {
            Some(settings) => Self::Tls {
                dial_timeout,
                insecure_skip_verify: settings.insecure_skip_verify,
                root_ca: (!settings.root_ca.is_empty())
                    .then(|| PathBuf::from(&settings.root_ca)),
            },
            None => Self::Tcp { dial_timeout },
        }
    }

    /// Dial `addr` and, for TLS, complete the handshake. One attempt,
    /// bounded by the dial timeout.
    pub(crate) async fn connect(&self, addr: &str) -> Result<Connection, ConnectError> {
        match self {
            Self::Tcp { dial_timeout } => {
                let stream = dial(addr, *dial_timeout).await?;
                Ok(Connection::Tcp(stream))
            }
            Self::Tls {
                dial_timeout,
                insecure_skip_verify,
                root_ca,
            } => {
                let stream = dial(addr, *dial_timeout).await?;

                let config = client_config(*insecure_skip_verify, root_ca.as_deref()).await?;
                let server_name = server_name(addr)?;
                let connector = TlsConnector::from(Arc::new(config));

                let handshake = timeout(*dial_timeout, connector.connect(server_name, stream))
                    .await
                    .map_err(|_| ConnectError::HandshakeTimeout {
                        addr: addr.to_string(),
                    })?
                    .map_err(|source| ConnectError::Handshake {
                        addr: addr.to_string(),
                        source,
                    })?;
                Ok(Connection::Tls(Box::new(handshake)))
            }
        }
    }
}

async fn dial(addr: &str, dial_timeout: Duration) -> Result<TcpStream, ConnectError> {
    let stream = timeout(dial_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ConnectError::DialTimeout {
            addr: addr.to_string(),
        })?
        .map_err(|source| ConnectError::Dial {
            addr: addr.to_string(),
            source,
        })?;

    // Frames are small and latency matters more than throughput here
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(addr = %addr, error = %e, "failed to set TCP_NODELAY");
    }
    Ok(stream)
}

/// Build a fresh client config for one attempt, re-reading any root-CA
/// bundle from disk.
async fn client_config(
    insecure_skip_verify: bool,
    root_ca: Option<&std::path::Path>,
) -> Result<ClientConfig, ConnectError> {
    if insecure_skip_verify {
        return Ok(ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth());
    }

    let mut roots = RootCertStore::empty();
    match root_ca {
        Some(path) => {
            let pem = tokio::fs::read(path)
                .await
                .map_err(|source| ConnectError::RootCaRead {
                    path: path.display().to_string(),
                    source,
                })?;
            let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(&pem)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConnectError::RootCaParse {
                    path: path.display().to_string(),
                })?;
            if certs.is_empty() {
                return Err(ConnectError::RootCaParse {
                    path: path.display().to_string(),
                });
            }
            for cert in certs {
                roots
                    .add(cert)
                    .map_err(|_| ConnectError::RootCaParse {
                        path: path.display().to_string(),
                    })?;
            }
        }
        None => {
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// SNI name: the host part of `host:port`.
fn server_name(addr: &str) -> Result<ServerName<'static>, ConnectError> {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    ServerName::try_from(host.to_string()).map_err(|_| ConnectError::ServerName {
        addr: addr.to_string(),
    })
}

/// An established connection to a collector.
#[derive(Debug)]
pub(crate) enum Connection {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Connection {
    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Tcp(s) => s.write_all(buf).await,
            Self::Tls(s) => s.write_all(buf).await,
        }
    }

    pub(crate) async fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(s) => s.flush().await,
            Self::Tls(s) => s.flush().await,
        }
    }

    pub(crate) async fn shutdown(&mut self) {
        let result = match self {
            Self::Tcp(s) => AsyncWriteExt::shutdown(s).await,
            Self::Tls(s) => AsyncWriteExt::shutdown(s).await,
        };
        if let Err(e) = result {
            tracing::trace!(error = %e, "error shutting down connection");
        }
    }
}

/// Errors from one connection attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("dial {addr}: {source}")]
    Dial { addr: String, source: io::Error },

    #[error("dial {addr}: timed out")]
    DialTimeout { addr: String },

    #[error("tls handshake with {addr}: {source}")]
    Handshake { addr: String, source: io::Error },

    #[error("tls handshake with {addr}: timed out")]
    HandshakeTimeout { addr: String },

    #[error("read root ca {path}: {source}")]
    RootCaRead { path: String, source: io::Error },

    #[error("no usable certificates in root ca {path}")]
    RootCaParse { path: String },

    #[error("invalid server name in address {addr}")]
    ServerName { addr: String },
}

/// Accepts any server certificate. Installed only when the operator sets
/// `insecure_skip_verify` on a sink.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
#[path = "connect_test.rs"]
mod connect_test;
