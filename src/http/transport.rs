//! Transport: one request/response exchange
//!
//! The client never touches sockets itself; every hop goes through a
//! `Transport`. `TcpTransport` is the HTTP/1.1 implementation, opening a
//! fresh connection per exchange over plain TCP or TLS.

use super::session::{FdSessionOps, HttpSession, SessionOps};
use super::tls::TlsConfig;
use super::{
    Error, Request, Response, ResponseParser, Result, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT,
};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};

/// Performs a single HTTP exchange
///
/// Implementations must accept any method, header set and binary body,
/// and must be safe to share between threads running independent
/// redirect chains.
pub trait Transport: Send + Sync {
    /// Send a fully-formed request and return the response
    fn send(&self, request: &Request) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for each read or write
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of the read buffer used while receiving a response
const READ_CHUNK: usize = 8192;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    connect_timeout: Duration,
    io_timeout: Duration,
    user_agent: String,
    tls: Option<TlsConfig>,
}

impl TransportConfig {
    /// Create a builder with default settings
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::builder().build()
    }
}

/// Builder for [`TransportConfig`]
#[derive(Debug)]
pub struct TransportConfigBuilder {
    connect_timeout: Duration,
    io_timeout: Duration,
    user_agent: String,
    tls: Option<TlsConfig>,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        TransportConfigBuilder {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            user_agent: concat!("hopclient/", env!("CARGO_PKG_VERSION")).to_string(),
            tls: None,
        }
    }
}

impl TransportConfigBuilder {
    /// Bound on establishing the TCP connection
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound on each individual read or write
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// User-Agent sent when a request does not set one
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// TLS settings for https URLs; without one a verifying default is
    /// created per connection
    ///
    /// The config is shared by every hop of a chain, so a servername
    /// override in it applies to all https hosts the chain visits.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn build(self) -> TransportConfig {
        TransportConfig {
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            user_agent: self.user_agent,
            tls: self.tls,
        }
    }
}

/// HTTP/1.1 transport over TCP, with TLS for https URLs
///
/// Holds only immutable configuration, so one instance can serve any
/// number of concurrent exchanges.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TransportConfig,
}

impl TcpTransport {
    /// Create a transport with the given configuration
    pub fn new(config: TransportConfig) -> Self {
        TcpTransport { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Add the framing headers the wire needs
    ///
    /// Caller-set Host and User-Agent win; Content-Length and Connection
    /// always reflect what is actually sent.
    fn prepare(&self, request: &Request) -> Request {
        let mut wire = request.clone();
        let headers = wire.headers_mut();

        if !headers.contains("host") {
            if let Some(host) = request.host_header() {
                headers.insert("host", host);
            }
        }
        if !headers.contains("user-agent") {
            headers.insert("user-agent", self.config.user_agent.as_str());
        }

        headers.remove("transfer-encoding");
        if !request.body().is_empty() || request.method().expects_body() {
            headers.insert("content-length", request.body().len().to_string());
        } else {
            headers.remove("content-length");
        }
        headers.insert("connection", "close");

        wire
    }

    fn connect(&self, url: &Url) -> Result<TcpStream> {
        let addrs = socket_addrs(url)?;
        let mut last_err = None;

        for addr in addrs {
            let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
            match socket.connect_timeout(&SockAddr::from(addr), self.config.connect_timeout) {
                Ok(()) => {
                    socket.set_nodelay(true)?;
                    let stream: TcpStream = socket.into();
                    // Bounds the blocking TLS handshake; HTTP I/O polls
                    stream.set_read_timeout(Some(self.config.io_timeout))?;
                    stream.set_write_timeout(Some(self.config.io_timeout))?;
                    return Ok(stream);
                }
                Err(e) => {
                    log::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(Error::Io(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses resolved for {}", url),
            )
        })))
    }

    fn exchange<S: SessionOps>(&self, ops: S, request: &Request) -> Result<Response> {
        let mut session = HttpSession::new(ops);
        session.set_timeout(Some(self.config.io_timeout));

        let result = self.round_trip(&mut session, request);
        if let Err(e) = session.close() {
            log::debug!("error closing connection to {}: {}", request.url(), e);
        }
        result
    }

    fn round_trip<S: SessionOps>(
        &self,
        session: &mut HttpSession<S>,
        request: &Request,
    ) -> Result<Response> {
        session.write_all(&self.prepare(request).to_wire())?;

        let mut parser = ResponseParser::for_method(request.method());
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            let n = session.read(&mut buf)?;
            if n == 0 {
                return parser.finish();
            }
            if let Some(response) = parser.parse(&buf[..n])? {
                return Ok(response);
            }
        }
    }

    fn tls_config(&self) -> Result<TlsConfig> {
        match &self.config.tls {
            Some(tls) => Ok(tls.clone()),
            None => Ok(TlsConfig::client()?.build()),
        }
    }
}

impl Transport for TcpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = request.url();
        let stream = self.connect(url)?;

        let response = match url.scheme() {
            "http" => self.exchange(FdSessionOps::new(stream), request)?,
            "https" => {
                let host = url
                    .host_str()
                    .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
                    .ok_or_else(|| Error::Parse(format!("URL has no host: {}", url)))?;
                let ops = self.tls_config()?.connect(stream, host)?;
                self.exchange(ops, request)?
            }
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };

        log::debug!("{} {} -> {}", request.method(), url, response.status());
        Ok(response)
    }
}

/// Resolve the socket addresses for a URL's host and port
fn socket_addrs(url: &Url) -> Result<Vec<SocketAddr>> {
    let port = match (url.port(), url.scheme()) {
        (Some(port), _) => port,
        (None, "http") => DEFAULT_HTTP_PORT,
        (None, "https") => DEFAULT_HTTPS_PORT,
        (None, other) => return Err(Error::UnsupportedScheme(other.to_string())),
    };

    match url.host() {
        Some(Host::Ipv4(ip)) => Ok(vec![SocketAddr::from((ip, port))]),
        Some(Host::Ipv6(ip)) => Ok(vec![SocketAddr::from((ip, port))]),
        Some(Host::Domain(domain)) => Ok((domain, port).to_socket_addrs()?.collect()),
        None => Err(Error::Parse(format!("URL has no host: {}", url))),
    }
}
