//! Transport establishment: plain TCP, or TLS behind the `tls` feature.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use arango_core::{ArangoError, Result};

use super::HostEndpoint;
use crate::config::TlsConfig;

/// A bidirectional byte stream a connection runs over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

/// Boxed transport.
pub type BoxedTransport = Box<dyn Transport>;

/// Opens transports to hosts.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Connects to `host`. No bytes are written.
    async fn connect(&self, host: &HostEndpoint) -> Result<BoxedTransport>;
}

/// Default connector over tokio TCP streams.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    tls: TlsConfig,
}

impl TcpConnector {
    /// Creates a connector. TLS settings apply to hosts flagged as TLS.
    pub fn new(tls: TlsConfig) -> Self {
        Self { tls }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &HostEndpoint) -> Result<BoxedTransport> {
        let address = host.address();
        let stream = TcpStream::connect(&address).await.map_err(|e| {
            ArangoError::ConnectionClosed(format!("failed to connect to {}: {}", address, e))
        })?;

        stream.set_nodelay(true).map_err(|e| {
            ArangoError::ConnectionClosed(format!("failed to set TCP_NODELAY: {}", e))
        })?;

        if host.is_tls() {
            return connect_tls(stream, host, &self.tls).await;
        }

        tracing::debug!(host = %host, "established tcp transport");
        Ok(Box::new(stream))
    }
}

#[cfg(feature = "tls")]
async fn connect_tls(
    stream: TcpStream,
    host: &HostEndpoint,
    config: &TlsConfig,
) -> Result<BoxedTransport> {
    use std::sync::Arc;

    use tokio_rustls::rustls::pki_types::ServerName;
    use tokio_rustls::TlsConnector;

    let client_config = tls::client_config(config)?;
    let server_name = ServerName::try_from(host.host().to_string()).map_err(|e| {
        ArangoError::Configuration(format!("invalid TLS server name {}: {}", host.host(), e))
    })?;

    let connector = TlsConnector::from(Arc::new(client_config));
    let stream = connector.connect(server_name, stream).await.map_err(|e| {
        ArangoError::ConnectionClosed(format!("TLS handshake with {} failed: {}", host, e))
    })?;

    tracing::debug!(host = %host, "established tls transport");
    Ok(Box::new(stream))
}

#[cfg(not(feature = "tls"))]
async fn connect_tls(
    _stream: TcpStream,
    host: &HostEndpoint,
    _config: &TlsConfig,
) -> Result<BoxedTransport> {
    Err(ArangoError::Configuration(format!(
        "host {} requires TLS but the `tls` feature is disabled",
        host
    )))
}

#[cfg(feature = "tls")]
mod tls {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
    use tokio_rustls::rustls::{ClientConfig, RootCertStore};

    use arango_core::{ArangoError, Result};

    use crate::config::TlsConfig;

    pub(super) fn client_config(config: &TlsConfig) -> Result<ClientConfig> {
        let mut roots = RootCertStore::empty();
        match config.ca_cert_path() {
            Some(path) => {
                for cert in load_certs(path)? {
                    roots.add(cert).map_err(|e| {
                        ArangoError::Configuration(format!(
                            "invalid CA certificate in {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                }
            }
            None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
        }

        let builder = ClientConfig::builder().with_root_certificates(roots);
        match (config.client_cert_path(), config.client_key_path()) {
            (Some(cert_path), Some(key_path)) => {
                let certs = load_certs(cert_path)?;
                let key = load_key(key_path)?;
                builder.with_client_auth_cert(certs, key).map_err(|e| {
                    ArangoError::Configuration(format!("invalid client certificate: {}", e))
                })
            }
            _ => Ok(builder.with_no_client_auth()),
        }
    }

    fn open(path: &Path) -> Result<BufReader<File>> {
        File::open(path).map(BufReader::new).map_err(|e| {
            ArangoError::Configuration(format!("cannot open {}: {}", path.display(), e))
        })
    }

    fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
        let mut reader = open(path)?;
        rustls_pemfile::certs(&mut reader)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                ArangoError::Configuration(format!(
                    "invalid certificate file {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
        let mut reader = open(path)?;
        rustls_pemfile::private_key(&mut reader)
            .map_err(|e| {
                ArangoError::Configuration(format!("invalid key file {}: {}", path.display(), e))
            })?
            .ok_or_else(|| {
                ArangoError::Configuration(format!("no private key found in {}", path.display()))
            })
    }
}
