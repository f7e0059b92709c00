// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! TLS Session Factory
//!
//! Opens mutually authenticated TLS sessions to the gateway and feedback
//! service. Supports both native-tls and rustls TLS backends.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use zeroize::Zeroizing;

use crate::certificate::CertificateProvider;
use crate::config::GatewayConfig;
use crate::error::{PushError, PushResult};
use crate::transport::{Endpoint, GatewaySession, SessionFactory};

#[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
mod backend {
    use std::net::{Shutdown, TcpStream};

    use native_tls::{Identity, TlsConnector, TlsStream};
    use pkcs8::der::SecretDocument;
    use pkcs8::LineEnding;

    use crate::certificate::{pem_sections, private_key_der, CertificateFormat};
    use crate::error::{PushError, PushResult};

    pub type Stream = TlsStream<TcpStream>;

    pub struct Connector(TlsConnector);

    /// Builds a connector presenting the client identity in `cert`.
    ///
    /// PKCS#12 bundles and encrypted PEM keys are decrypted with the
    /// passphrase. PEM keys are handed to the platform library as PKCS#8.
    pub fn build_connector(cert: &[u8], passphrase: Option<&str>) -> PushResult<Connector> {
        let identity = match CertificateFormat::detect(cert) {
            CertificateFormat::Pkcs12 => {
                Identity::from_pkcs12(cert, passphrase.unwrap_or("")).map_err(|e| {
                    PushError::Configuration(format!("invalid PKCS#12 certificate: {}", e))
                })?
            }
            CertificateFormat::Pem => {
                let mut chain = Vec::new();
                for section in pem_sections(cert, "CERTIFICATE") {
                    chain.extend_from_slice(section);
                    chain.push(b'\n');
                }
                if chain.is_empty() {
                    return Err(PushError::Configuration(
                        "no certificate found in PEM data".into(),
                    ));
                }
                let key_der = private_key_der(cert, passphrase)?;
                let key = SecretDocument::try_from(key_der.as_slice())
                    .and_then(|document| document.to_pem("PRIVATE KEY", LineEnding::LF))
                    .map_err(|e| {
                        PushError::Configuration(format!("invalid private key: {}", e))
                    })?;
                Identity::from_pkcs8(&chain, key.as_bytes()).map_err(|e| {
                    PushError::Configuration(format!("invalid PEM certificate: {}", e))
                })?
            }
        };

        let connector = TlsConnector::builder()
            .identity(identity)
            .build()
            .map_err(|e| PushError::Configuration(format!("TLS error: {}", e)))?;
        Ok(Connector(connector))
    }

    pub fn handshake(connector: &Connector, host: &str, tcp: TcpStream) -> PushResult<Stream> {
        connector
            .0
            .connect(host, tcp)
            .map_err(|e| PushError::ConnectionFailed(format!("TLS handshake failed: {}", e)))
    }

    pub fn shutdown(stream: &mut Stream) -> std::io::Result<()> {
        let tls = stream.shutdown();
        let tcp = stream.get_ref().shutdown(Shutdown::Both);
        tls.and(tcp)
    }
}

#[cfg(feature = "tls-rustls")]
mod backend {
    use std::io::Write;
    use std::net::{Shutdown, TcpStream};
    use std::sync::Arc;

    use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
    use rustls_pki_types::pem::PemObject;
    use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};

    use crate::certificate::{private_key_der, CertificateFormat};
    use crate::error::{PushError, PushResult};

    pub type Stream = StreamOwned<ClientConnection, TcpStream>;

    pub struct Connector(Arc<ClientConfig>);

    /// Builds a client config presenting the PEM certificate chain and key.
    ///
    /// An encrypted key is decrypted with the passphrase. PKCS#12 bundles
    /// need the `tls-native` feature.
    pub fn build_connector(cert: &[u8], passphrase: Option<&str>) -> PushResult<Connector> {
        if CertificateFormat::detect(cert) == CertificateFormat::Pkcs12 {
            return Err(PushError::Configuration(
                "PKCS#12 certificates need the tls-native feature; convert to PEM".into(),
            ));
        }
        let certs = CertificateDer::pem_slice_iter(cert)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PushError::Configuration(format!("invalid PEM certificate: {:?}", e)))?;
        if certs.is_empty() {
            return Err(PushError::Configuration(
                "no certificate found in PEM data".into(),
            ));
        }
        let key_der = private_key_der(cert, passphrase)?;
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der.to_vec()));

        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_client_auth_cert(certs, key)
            .map_err(|e| PushError::Configuration(format!("TLS setup failed: {}", e)))?;
        Ok(Connector(Arc::new(config)))
    }

    pub fn handshake(connector: &Connector, host: &str, tcp: TcpStream) -> PushResult<Stream> {
        let server_name: ServerName<'_> = host.try_into().map_err(|_| {
            PushError::ConnectionFailed(format!("Invalid server name: {}", host))
        })?;
        let conn = ClientConnection::new(Arc::clone(&connector.0), server_name.to_owned())
            .map_err(|e| PushError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        let mut stream = StreamOwned::new(conn, tcp);
        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(|e| PushError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;
        }
        Ok(stream)
    }

    pub fn shutdown(stream: &mut Stream) -> std::io::Result<()> {
        stream.conn.send_close_notify();
        let tls = write_pending(&mut stream.conn, &mut stream.sock);
        let tcp = stream.sock.shutdown(Shutdown::Both);
        tls.and(tcp)
    }

    /// Writes queued TLS records until none remain or the socket stops
    /// accepting bytes.
    fn write_pending(conn: &mut ClientConnection, sock: &mut impl Write) -> std::io::Result<()> {
        while conn.wants_write() {
            if conn.write_tls(sock)? == 0 {
                break;
            }
        }
        Ok(())
    }

}

/// Opens TLS sessions authenticated with the client certificate.
///
/// The TLS context is built on the first successful open and reused after
/// that. Certificate problems surface as `PushError::Configuration` before
/// any socket is opened.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use pushgate_core::{CertificateProvider, Endpoint, SessionFactory, TlsSessionFactory};
///
/// let certificate = Arc::new(CertificateProvider::from_path("/etc/push/cert.pem"));
/// let factory = TlsSessionFactory::new(certificate, None);
/// let session = factory.open(&Endpoint::new("gateway.push.apple.com", 2195))?;
/// ```
pub struct TlsSessionFactory {
    certificate: Arc<CertificateProvider>,
    passphrase: Option<Zeroizing<String>>,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
    connector: OnceCell<backend::Connector>,
}

impl TlsSessionFactory {
    /// Creates a factory with no socket timeouts.
    pub fn new(certificate: Arc<CertificateProvider>, passphrase: Option<Zeroizing<String>>) -> Self {
        TlsSessionFactory {
            certificate,
            passphrase,
            connect_timeout: None,
            io_timeout: None,
            connector: OnceCell::new(),
        }
    }

    /// Creates a factory using the passphrase and timeouts from `config`.
    pub fn from_config(config: &GatewayConfig, certificate: Arc<CertificateProvider>) -> Self {
        Self::new(certificate, config.passphrase.clone()).with_timeouts(
            config.connect_timeout_ms.map(Duration::from_millis),
            config.io_timeout_ms.map(Duration::from_millis),
        )
    }

    /// Sets socket timeouts. Zero durations are treated as no timeout.
    pub fn with_timeouts(mut self, connect: Option<Duration>, io: Option<Duration>) -> Self {
        self.connect_timeout = connect.filter(|d| !d.is_zero());
        self.io_timeout = io.filter(|d| !d.is_zero());
        self
    }

    /// Returns the certificate provider.
    pub fn certificate(&self) -> &Arc<CertificateProvider> {
        &self.certificate
    }

    fn connector(&self) -> PushResult<&backend::Connector> {
        self.connector.get_or_try_init(|| {
            let cert = self.certificate.resolve()?;
            let passphrase = self.passphrase.as_deref().map(String::as_str);
            backend::build_connector(&cert, passphrase)
        })
    }

    fn connect_tcp(&self, endpoint: &Endpoint) -> PushResult<TcpStream> {
        let addr = (endpoint.host.as_str(), endpoint.port);
        let tcp_stream = match self.connect_timeout {
            None => TcpStream::connect(addr)
                .map_err(|e| PushError::ConnectionFailed(format!("{}: {}", endpoint, e)))?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                let addrs = addr
                    .to_socket_addrs()
                    .map_err(|e| PushError::ConnectionFailed(format!("{}: {}", endpoint, e)))?;
                for socket_addr in addrs {
                    match TcpStream::connect_timeout(&socket_addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                connected.ok_or_else(|| {
                    let reason = last_err
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no addresses resolved".into());
                    PushError::ConnectionFailed(format!("{}: {}", endpoint, reason))
                })?
            }
        };

        tcp_stream
            .set_read_timeout(self.io_timeout)
            .map_err(|e| PushError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_write_timeout(self.io_timeout)
            .map_err(|e| PushError::ConnectionFailed(e.to_string()))?;
        Ok(tcp_stream)
    }
}

impl SessionFactory for TlsSessionFactory {
    type Session = TlsSession;

    fn open(&self, endpoint: &Endpoint) -> PushResult<TlsSession> {
        let connector = self.connector()?;
        let tcp_stream = self.connect_tcp(endpoint)?;

        let stream = backend::handshake(connector, &endpoint.host, tcp_stream)?;
        tracing::debug!(%endpoint, "TLS handshake complete");

        Ok(TlsSession {
            stream,
            closed: false,
        })
    }
}

impl std::fmt::Debug for TlsSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSessionFactory")
            .field("certificate", &self.certificate)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .field("context_ready", &self.connector.get().is_some())
            .finish()
    }
}

/// A TLS session over TCP; closing it shuts down both layers.
pub struct TlsSession {
    stream: backend::Stream,
    closed: bool,
}

impl Read for TlsSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TlsSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl GatewaySession for TlsSession {
    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        backend::shutdown(&mut self.stream)
    }
}
