//! HTTP/1.1 client with redirect policy
//!
//! This module provides an HTTP client that follows redirect chains under
//! caller-supplied policy, and the wire layer it runs on.
//!
//! # Architecture
//!
//! - `Request`/`Response` are plain value types; a fresh `Request` is built
//!   for every hop of a redirect chain
//! - `redirect::decide_next` is a pure function that decides whether a
//!   response is followed and what the next request looks like
//! - `HttpClient` drives the chain, sending each hop through a `Transport`
//! - `TcpTransport` performs one HTTP/1.1 exchange per hop using the
//!   session operations abstraction (`SessionOps`), so plain TCP and TLS
//!   share the same I/O code
//!
//! # Examples
//!
//! ```no_run
//! use hopclient::http::{ClientOptions, HttpClient, Method, Request, TcpTransport};
//!
//! let client = HttpClient::new(TcpTransport::default());
//!
//! let options = ClientOptions::builder()
//!     .follow(true)
//!     .follow_header("Authorization")
//!     .strict_redirect(true)
//!     .build();
//!
//! let request = Request::builder()
//!     .method(Method::Post)
//!     .uri("http://127.0.0.1:8080/submit")
//!     .header("Authorization", "Bearer token")
//!     .body("payload")
//!     .build()
//!     .unwrap();
//!
//! let response = client.execute(request, &options).unwrap();
//! assert_eq!(response.status().code(), 200);
//! ```

pub mod chunked;
pub mod client;
pub mod headers;
pub mod message;
pub mod options;
pub mod parser;
pub mod redirect;
pub mod server;
pub mod session;
pub mod tls;
pub mod transport;

pub use client::{ClientError, HttpClient};
pub use headers::Headers;
pub use message::{
    IncomingRequest, Method, Request, RequestBuilder, Response, ResponseBuilder, Status, Version,
};
pub use options::{ClientOptions, ClientOptionsBuilder};
pub use parser::{RequestParser, ResponseParser};
pub use redirect::{decide_next, MethodRule, NextAction, RedirectStatus, StopReason};
pub use server::HttpServer;
pub use session::{FdSessionOps, HttpSession, SessionOps};
pub use transport::{TcpTransport, Transport, TransportConfig, TransportConfigBuilder};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP wire and transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] tls::TlsError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Too many headers (limit {MAX_HEADERS})")]
    TooManyHeaders,

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Incomplete message")]
    Incomplete,

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Maximum number of headers per message
pub const MAX_HEADERS: usize = 64;

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default HTTPS port
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Default bound on the number of redirects followed in one chain
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// CRLF line ending
pub const CRLF: &str = "\r\n";
