//! TLS configuration
//!
//! This module provides TLS configuration builders for both client and server.

use openssl::pkey::PKey;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode, SslVersion};
use openssl::x509::X509;
use std::net::TcpStream;
use std::path::Path;

/// TLS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

impl TlsVersion {
    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(&self) -> SslVersion {
        match self {
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLSv1.0",
            TlsVersion::Tls11 => "TLSv1.1",
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

/// TLS errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),
}

/// TLS configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    pub(crate) ctx: SslContext,
    pub(crate) is_server: bool,
    pub(crate) servername: Option<String>,
    pub(crate) verify_peer: bool,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("is_server", &self.is_server)
            .field("servername", &self.servername)
            .field("verify_peer", &self.verify_peer)
            .finish_non_exhaustive()
    }
}

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> Result<ClientConfigBuilder, TlsError> {
        ClientConfigBuilder::new()
    }

    /// Create a new server configuration builder
    pub fn server() -> Result<ServerConfigBuilder, TlsError> {
        ServerConfigBuilder::new()
    }

    /// Whether the peer certificate chain and name are verified
    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// Name sent as SNI and checked against the peer certificate
    ///
    /// A servername override wins over `host` for every connection made
    /// with this config.
    pub fn peer_name<'a>(&'a self, host: &'a str) -> &'a str {
        self.servername.as_deref().unwrap_or(host)
    }

    /// Connect to a server with TLS (client-side)
    ///
    /// `host` is used for SNI and, when peer verification is on, for
    /// certificate name checks, unless a servername override was set.
    /// See [`peer_name`](Self::peer_name).
    pub fn connect(
        &self,
        stream: TcpStream,
        host: &str,
    ) -> Result<super::TlsSessionOps, TlsError> {
        if self.is_server {
            return Err(TlsError::InvalidConfig(
                "Cannot use server config for client connection".to_string(),
            ));
        }
        super::session::TlsSessionOps::connect(stream, self, self.peer_name(host))
    }

    /// Accept a client connection with TLS (server-side)
    pub fn accept(&self, stream: TcpStream) -> Result<super::TlsSessionOps, TlsError> {
        if !self.is_server {
            return Err(TlsError::InvalidConfig(
                "Cannot use client config for server accept".to_string(),
            ));
        }
        super::session::TlsSessionOps::accept(stream, self)
    }
}

fn set_version_range(
    builder: &mut SslContextBuilder,
    min: TlsVersion,
    max: TlsVersion,
) -> Result<(), TlsError> {
    if min > max {
        return Err(TlsError::InvalidConfig(format!(
            "Minimum version {} is above maximum {}",
            min.as_str(),
            max.as_str()
        )));
    }
    builder.set_min_proto_version(Some(min.to_openssl_version()))?;
    builder.set_max_proto_version(Some(max.to_openssl_version()))?;
    Ok(())
}

/// Client configuration builder
pub struct ClientConfigBuilder {
    ctx_builder: SslContextBuilder,
    servername: Option<String>,
    verify_peer: bool,
}

impl ClientConfigBuilder {
    fn new() -> Result<Self, TlsError> {
        let mut ctx_builder = SslContextBuilder::new(SslMethod::tls_client())?;

        // Verify against the system trust store unless told otherwise
        ctx_builder.set_default_verify_paths()?;
        ctx_builder.set_verify(SslVerifyMode::PEER);

        Ok(ClientConfigBuilder {
            ctx_builder,
            servername: None,
            verify_peer: true,
        })
    }

    /// Set TLS version (both min and max)
    pub fn version(self, version: TlsVersion) -> Result<Self, TlsError> {
        self.version_range(version, version)
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Result<Self, TlsError> {
        set_version_range(&mut self.ctx_builder, min, max)?;
        Ok(self)
    }

    /// Trust the CA certificates in a PEM file, in addition to the
    /// system store
    pub fn ca_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, TlsError> {
        self.ctx_builder.set_ca_file(path.as_ref()).map_err(|e| {
            TlsError::Certificate(format!(
                "Failed to load CA file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(self)
    }

    /// Override the name used for SNI and certificate checks
    ///
    /// The override belongs to the config, not to a host: a transport built
    /// with it presents this name on every https connection, including
    /// redirect hops to other hosts. Leave it unset for chains that may
    /// cross hosts.
    pub fn servername(mut self, name: impl Into<String>) -> Self {
        self.servername = Some(name.into());
        self
    }

    /// Enable/disable peer certificate verification
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self.ctx_builder.set_verify(if verify {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });
        self
    }

    /// Build the TLS configuration
    pub fn build(self) -> TlsConfig {
        TlsConfig {
            ctx: self.ctx_builder.build(),
            is_server: false,
            servername: self.servername,
            verify_peer: self.verify_peer,
        }
    }
}

/// Server configuration builder
pub struct ServerConfigBuilder {
    ctx_builder: SslContextBuilder,
    has_cert: bool,
}

impl ServerConfigBuilder {
    fn new() -> Result<Self, TlsError> {
        Ok(ServerConfigBuilder {
            ctx_builder: SslContextBuilder::new(SslMethod::tls_server())?,
            has_cert: false,
        })
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Result<Self, TlsError> {
        set_version_range(&mut self.ctx_builder, min, max)?;
        Ok(self)
    }

    /// Use a PEM certificate and PEM private key
    pub fn cert_pem(mut self, cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TlsError> {
        let cert = X509::from_pem(cert_pem)
            .map_err(|e| TlsError::Certificate(format!("Failed to load certificate: {}", e)))?;
        let key = PKey::private_key_from_pem(key_pem)
            .map_err(|e| TlsError::Certificate(format!("Failed to load private key: {}", e)))?;

        self.ctx_builder.set_certificate(&cert)?;
        self.ctx_builder.set_private_key(&key)?;
        self.ctx_builder.check_private_key()?;
        self.has_cert = true;

        Ok(self)
    }

    /// Build the TLS configuration
    pub fn build(self) -> Result<TlsConfig, TlsError> {
        if !self.has_cert {
            return Err(TlsError::InvalidConfig(
                "Server configuration requires a certificate".to_string(),
            ));
        }

        Ok(TlsConfig {
            ctx: self.ctx_builder.build(),
            is_server: true,
            servername: None,
            verify_peer: false,
        })
    }
}
