//! Dialing: TCP connect plus optional TLS upgrade.

use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{CryptoProvider, aws_lc_rs};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    ClientConfig, ConfigBuilder, DigitallySignedStruct, Error as RustlsError, RootCertStore,
    SignatureScheme, WantsVerifier,
};
use tracing::{info, warn};

use super::error::TransportError;
use super::stream::IrcStream;

/// TLS settings for [`dial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsOptions {
    /// Validate the server certificate against the native root store.
    pub verify_cert: bool,
}

/// Split `host:port` into its parts, accepting bracketed IPv6 literals.
pub fn split_host_port(addr: &str) -> Result<(&str, u16), TransportError> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| TransportError::InvalidAddress(addr.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(TransportError::InvalidAddress(addr.to_string()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| TransportError::InvalidAddress(addr.to_string()))?;
    Ok((host, port))
}

/// Open a connection to `addr` (`host:port`), upgrading to TLS when asked.
pub async fn dial(addr: &str, tls: Option<TlsOptions>) -> Result<IrcStream, TransportError> {
    let (host, port) = split_host_port(addr)?;
    let tcp_stream = TcpStream::connect((host, port)).await?;
    if let Err(e) = tcp_stream.set_nodelay(true) {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }

    match tls {
        Some(options) => {
            let stream = upgrade_to_tls(tcp_stream, host, options.verify_cert).await?;
            Ok(IrcStream::Tls(Box::new(stream)))
        }
        None => Ok(IrcStream::Plain(tcp_stream)),
    }
}

/// aws-lc-rs, named explicitly. With more than one rustls backend compiled in
/// there is no process default to fall back on.
fn provider() -> Arc<CryptoProvider> {
    Arc::new(aws_lc_rs::default_provider())
}

fn client_builder() -> Result<ConfigBuilder<ClientConfig, WantsVerifier>, TransportError> {
    ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))
}

async fn upgrade_to_tls(
    tcp_stream: TcpStream,
    hostname: &str,
    verify_cert: bool,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, TransportError> {
    let config = if verify_cert {
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
        client_builder()?
            .with_root_certificates(roots)
            .with_no_client_auth()
    } else {
        client_builder()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
            .with_no_client_auth()
    };

    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|e| TransportError::Tls(e.to_string()))?;

    let tls_stream = connector.connect(server_name, tcp_stream).await?;
    info!(hostname = %hostname, verify = verify_cert, "TLS handshake completed");

    Ok(tls_stream)
}

/// Accepts any server certificate. Only used with `verify_cert = false`.
#[derive(Debug)]
struct NoCertificateVerification;

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
