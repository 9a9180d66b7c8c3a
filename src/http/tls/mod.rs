//! TLS support for HTTP connections
//!
//! TLS is layered in through the session operations abstraction:
//!
//! 1. `TlsConfig` holds an OpenSSL context plus per-connection settings
//! 2. `TlsSessionOps` implements `SessionOps` for encrypted I/O
//! 3. The transport and server code stay unchanged and use TLS
//!    transparently
//!
//! # Examples
//!
//! ```no_run
//! use hopclient::http::tls::{TlsConfig, TlsVersion};
//! use hopclient::http::{TcpTransport, TransportConfig};
//!
//! let tls = TlsConfig::client()
//!     .unwrap()
//!     .version_range(TlsVersion::Tls12, TlsVersion::Tls13)
//!     .unwrap()
//!     .ca_file("/etc/ssl/internal-ca.pem")
//!     .unwrap()
//!     .build();
//!
//! let transport = TcpTransport::new(TransportConfig::builder().tls(tls).build());
//! ```

pub mod config;
pub mod session;

pub use config::{ClientConfigBuilder, ServerConfigBuilder, TlsConfig, TlsError, TlsVersion};
pub use session::TlsSessionOps;

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
