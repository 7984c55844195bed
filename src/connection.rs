//! TLS connection setup for the evaluator service.
//!
//! [`connect`] opens a TCP socket, completes a rustls handshake and returns a
//! stream ready to hand to a [`Session`](crate::protocol::Session). Root
//! certificates are read from the OS store. Clearing
//! [`ConnectOptions::verify_certificates`] accepts any server certificate
//! while still checking the handshake signatures.
use std::{
    io::{self, Write},
    net::TcpStream,
    sync::Arc,
    time::Duration,
};

use log::{debug, info, warn};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
    StreamOwned,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature},
};
use rustls_pki_types::{CertificateDer, InvalidDnsNameError, ServerName, UnixTime};
use thiserror::Error;

/// Port the evaluator service listens on for TLS connections.
pub const DEFAULT_PORT: u16 = 27995;

pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid server name '{host}': {source}")]
    ServerName {
        host: String,
        source: InvalidDnsNameError,
    },
    #[error("no usable root certificates found in the OS certificate store")]
    NoRootCertificates,
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("Connection IO Error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub port: u16,
    /// Verify the server certificate against the OS root store.
    pub verify_certificates: bool,
    /// Read and write timeout applied to the socket.
    pub timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            verify_certificates: true,
            timeout: None,
        }
    }
}

/// Connects to `host` and completes the TLS handshake.
pub fn connect(host: &str, options: &ConnectOptions) -> Result<TlsStream, ConnectError> {
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|source| ConnectError::ServerName {
            host: host.to_string(),
            source,
        })?;
    let config = client_config(options.verify_certificates)?;

    info!("connecting to {host}:{}", options.port);
    let mut socket = TcpStream::connect((host, options.port))?;
    socket.set_read_timeout(options.timeout)?;
    socket.set_write_timeout(options.timeout)?;

    let mut connection = ClientConnection::new(Arc::new(config), server_name)?;
    while connection.is_handshaking() {
        connection.complete_io(&mut socket)?;
    }
    debug!("handshake complete, {:?}", connection.protocol_version());

    Ok(StreamOwned::new(connection, socket))
}

/// Sends a TLS close_notify to the peer.
pub fn close(stream: &mut TlsStream) -> io::Result<()> {
    stream.conn.send_close_notify();
    stream.flush()
}

fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn client_config(verify_certificates: bool) -> Result<ClientConfig, ConnectError> {
    let provider = crypto_provider();
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?;

    let config = if verify_certificates {
        builder
            .with_root_certificates(native_root_store()?)
            .with_no_client_auth()
    } else {
        warn!("server certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    };

    Ok(config)
}

fn native_root_store() -> Result<RootCertStore, ConnectError> {
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        warn!("error loading native root certificate: {err}");
    }

    let mut store = RootCertStore::empty();
    let (added, ignored) = store.add_parsable_certificates(result.certs);
    if ignored > 0 {
        warn!("{ignored} native root certificates could not be parsed");
    }
    if added == 0 {
        return Err(ConnectError::NoRootCertificates);
    }

    debug!("loaded {added} native root certificates");
    Ok(store)
}

/// Accepts any server certificate. Handshake signatures are still verified
/// with the provider's algorithms.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
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
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
