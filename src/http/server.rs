//! HTTP server side of a session
//!
//! A small request/response driver over any `SessionOps`, used to stand up
//! fixture servers for the client's tests.

use super::{
    chunked, Error, Headers, HttpSession, IncomingRequest, RequestParser, Response, Result,
    SessionOps, Status,
};
use std::time::Duration;

const READ_CHUNK: usize = 4096;

/// HTTP server
///
/// Provides methods for receiving requests and sending responses.
pub struct HttpServer<S: SessionOps> {
    session: HttpSession<S>,
    parser: RequestParser,
}

impl<S: SessionOps> HttpServer<S> {
    /// Create a new HTTP server with a session
    pub fn new(session: S) -> Self {
        HttpServer {
            session: HttpSession::new(session),
            parser: RequestParser::new(),
        }
    }

    /// Set the timeout for operations
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.session.set_timeout(Some(timeout));
    }

    /// Receive the next request on the connection
    ///
    /// Bytes read past the end of one request are kept for the next call.
    pub fn receive_request(&mut self) -> Result<IncomingRequest> {
        self.parser.reset();
        if let Some(request) = self.parser.parse(&[])? {
            return Ok(request);
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.session.read(&mut chunk)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }

            if let Some(request) = self.parser.parse(&chunk[..n])? {
                return Ok(request);
            }
        }
    }

    /// Send a response
    ///
    /// A Content-Length header is added when the response carries neither
    /// a length nor a transfer coding.
    pub fn send_response(&mut self, response: &Response) -> Result<()> {
        let headers = response.headers();
        if headers.contains("content-length") || headers.contains("transfer-encoding") {
            return self.session.write_all(&response.to_wire());
        }

        let mut framed = response.clone();
        framed
            .headers_mut()
            .insert("Content-Length", response.body().len().to_string());
        self.session.write_all(&framed.to_wire())
    }

    /// Send a simple 200 OK response
    pub fn send_ok(&mut self, body: &[u8]) -> Result<()> {
        let response = Response::builder()
            .status(Status::OK)
            .header("Content-Type", "text/plain")
            .body(body.to_vec())
            .build();

        self.send_response(&response)
    }

    /// Send a simple error response
    pub fn send_error(&mut self, status: Status, message: &str) -> Result<()> {
        let response = Response::builder()
            .status(status)
            .header("Content-Type", "text/plain")
            .body(message.as_bytes().to_vec())
            .build();

        self.send_response(&response)
    }

    /// Send a response with a chunked body
    pub fn send_chunked_response(
        &mut self,
        status: Status,
        headers: &Headers,
        chunks: &[&[u8]],
    ) -> Result<()> {
        let mut headers = headers.clone();
        headers.remove("content-length");
        headers.insert("Transfer-Encoding", "chunked");

        let head = Response::builder().status(status).headers(headers).build();
        let mut wire = head.head_to_wire();

        let mut encoder = chunked::ChunkedEncoder::new(&mut wire);
        for chunk in chunks {
            encoder.write_chunk(chunk)?;
        }
        encoder.finish()?;

        self.session.write_all(&wire)
    }

    /// Close the connection
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    /// Get a reference to the underlying session
    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }
}
