//! Certificates presented by remote hosts during a TLS handshake.
//!
//! The handshake accepts whatever chain the server sends, so an expired
//! or untrusted certificate can still be captured and reported. Handshake
//! signatures are still checked.

use crate::certificate::CertificateChain;
use crate::error::ExpiringCertsError;
use crate::CertificateSource;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 443;

#[derive(Debug, Clone, Default)]
pub struct NetworkSource {
    /// `host` or `host:port` entries.
    pub domains: Vec<String>,
    /// Bounds connect, read and write when set.
    pub timeout: Option<Duration>,
}

impl NetworkSource {
    pub fn new(domains: Vec<String>) -> Self {
        NetworkSource {
            domains,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CertificateSource for NetworkSource {
    fn certificates(&self) -> Result<Vec<CertificateChain>, ExpiringCertsError> {
        let config = client_config()?;
        self.domains
            .iter()
            .map(|domain| download_chain(&config, domain, self.timeout))
            .collect()
    }
}

/// Split `host[:port]` into its parts, defaulting to port 443.
///
/// IPv6 literals need brackets when a port is given: `[::1]:8443`.
pub fn split_host_port(domain: &str) -> Result<(String, u16), ExpiringCertsError> {
    let invalid = || ExpiringCertsError::InvalidDomain(domain.to_string());
    let domain = domain.trim();

    if let Some(rest) = domain.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
        let port = match after {
            "" => DEFAULT_PORT,
            _ => after.strip_prefix(':').and_then(|p| p.parse().ok()).ok_or_else(invalid)?,
        };
        return if host.is_empty() { Err(invalid()) } else { Ok((host.to_string(), port)) };
    }

    match domain.matches(':').count() {
        0 if !domain.is_empty() => Ok((domain.to_string(), DEFAULT_PORT)),
        1 => {
            let (host, port) = domain.split_once(':').ok_or_else(invalid)?;
            let port = port.parse().map_err(|_| invalid())?;
            if host.is_empty() {
                Err(invalid())
            } else {
                Ok((host.to_string(), port))
            }
        }
        // Bare IPv6 address without a port.
        n if n > 1 => Ok((domain.to_string(), DEFAULT_PORT)),
        _ => Err(invalid()),
    }
}

/// Client configuration that captures the peer chain without judging it.
pub fn client_config() -> Result<Arc<ClientConfig>, ExpiringCertsError> {
    let provider = Arc::new(ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| ExpiringCertsError::ConfigError(format!("TLS configuration: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(CaptureVerifier(provider)))
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Connect to `domain`, complete a handshake and return the presented chain.
pub fn download_chain(
    config: &Arc<ClientConfig>,
    domain: &str,
    timeout: Option<Duration>,
) -> Result<CertificateChain, ExpiringCertsError> {
    let (host, port) = split_host_port(domain)?;
    let target = format!("{}:{}", host, port);
    let dial_error = |reason: String| ExpiringCertsError::TlsDialError {
        domain: target.clone(),
        reason,
    };

    let server_name = ServerName::try_from(host.clone())
        .map_err(|e| ExpiringCertsError::InvalidDomain(format!("{}: {}", host, e)))?;

    tracing::debug!(%target, "dialing");
    let mut sock = connect(&host, port, timeout).map_err(|e| dial_error(e.to_string()))?;
    let mut conn = ClientConnection::new(Arc::clone(config), server_name).map_err(|e| dial_error(e.to_string()))?;

    let handshake = complete_handshake(&mut conn, &mut sock);
    let presented = conn
        .peer_certificates()
        .map(|certs| certs.to_vec())
        .unwrap_or_default();

    // Best effort close, the socket is dropped either way.
    conn.send_close_notify();
    while conn.wants_write() {
        if conn.write_tls(&mut sock).is_err() {
            break;
        }
    }
    drop(sock);

    handshake.map_err(|e| dial_error(e.to_string()))?;
    if presented.is_empty() {
        return Err(dial_error("no certificates presented".to_string()));
    }
    tracing::debug!(%target, chain_length = presented.len(), "captured certificate chain");

    CertificateChain::from_der_chain(presented, target.clone())
}

fn connect(host: &str, port: u16, timeout: Option<Duration>) -> std::io::Result<TcpStream> {
    let timeout = match timeout {
        None => return TcpStream::connect((host, port)),
        Some(timeout) => timeout,
    };

    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(sock) => {
                sock.set_read_timeout(Some(timeout))?;
                sock.set_write_timeout(Some(timeout))?;
                return Ok(sock);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} did not resolve", host))
    }))
}

fn complete_handshake(conn: &mut ClientConnection, sock: &mut TcpStream) -> std::io::Result<()> {
    while conn.is_handshaking() {
        conn.complete_io(sock)?;
    }
    Ok(())
}

/// Accepts any certificate so the chain can be inspected afterwards.
#[derive(Debug)]
struct CaptureVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for CaptureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
