//! HTTP message parsing
//!
//! Incremental parsers for HTTP/1.x requests and responses. Both are fed
//! whatever bytes the session produced and return a message once it is
//! complete.

use super::chunked::ChunkedDecoder;
use super::message::IncomingRequest;
use super::{Error, Headers, Method, Response, Result, Status, Version, CRLF, MAX_HEADERS};
use bytes::Bytes;

/// Upper bound on the start line plus header section
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Find the next CRLF in a buffer
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF.as_bytes())
}

/// Remove one CRLF-terminated line from the front of the buffer
fn take_line(buf: &mut Vec<u8>) -> Result<Option<String>> {
    match find_crlf(buf) {
        Some(pos) => {
            let line = String::from_utf8_lossy(&buf[..pos]).into_owned();
            buf.drain(..pos + 2);
            Ok(Some(line))
        }
        None if buf.len() > MAX_HEAD_SIZE => {
            Err(Error::Protocol("Message head too large".to_string()))
        }
        None => Ok(None),
    }
}

/// Parse HTTP request line
///
/// Format: METHOD TARGET VERSION
/// Example: GET /index.html HTTP/1.1
pub fn parse_request_line(line: &str) -> Result<(Method, String, Version)> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() != 3 {
        return Err(Error::Parse(format!(
            "Invalid request line: expected 3 parts, got {}",
            parts.len()
        )));
    }

    let method = parts[0].parse()?;
    let version = parts[2].parse()?;

    Ok((method, parts[1].to_string(), version))
}

/// Parse HTTP response status line
///
/// Format: VERSION STATUS [REASON]
/// Example: HTTP/1.1 200 OK
pub fn parse_status_line(line: &str) -> Result<(Version, Status, String)> {
    let mut parts = line.splitn(3, ' ');

    let version = parts
        .next()
        .ok_or_else(|| Error::Parse("Empty status line".to_string()))?
        .parse()?;
    let code = parts
        .next()
        .ok_or_else(|| Error::Parse(format!("Invalid status line: {}", line)))?;
    let code = code
        .parse::<u16>()
        .map_err(|_| Error::Parse(format!("Invalid status code: {}", code)))?;
    let status = Status::new(code)?;

    let reason = match parts.next() {
        Some(reason) if !reason.is_empty() => reason.to_string(),
        _ => status.reason_phrase().to_string(),
    };

    Ok((version, status, reason))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParserState {
    StartLine,
    Headers,
    Body,
    Complete,
}

/// How a message body is delimited on the wire
#[derive(Debug)]
enum Framing {
    Empty,
    Length(usize),
    Chunked(ChunkedDecoder),
    UntilClose,
}

impl Framing {
    /// Framing from Transfer-Encoding / Content-Length. `None` means the
    /// message gave no length information.
    fn from_headers(headers: &Headers) -> Result<Option<Framing>> {
        if let Some(encoding) = headers.get("transfer-encoding") {
            let last = encoding.rsplit(',').next().unwrap_or_default().trim();
            if last.eq_ignore_ascii_case("chunked") {
                return Ok(Some(Framing::Chunked(ChunkedDecoder::new())));
            }
            return Ok(Some(Framing::UntilClose));
        }

        if let Some(cl_str) = headers.get("content-length") {
            let length = cl_str
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::Parse(format!("Invalid Content-Length: {}", cl_str)))?;
            return Ok(Some(Framing::Length(length)));
        }

        Ok(None)
    }
}

/// Collects a body from the parser buffer according to its framing
#[derive(Debug)]
struct BodyReader {
    framing: Framing,
    body: Vec<u8>,
}

impl BodyReader {
    fn new(framing: Framing) -> Self {
        BodyReader {
            framing,
            body: Vec::new(),
        }
    }

    /// Move body bytes out of `buf`; returns true once the body is complete
    fn advance(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        match &mut self.framing {
            Framing::Empty => Ok(true),
            Framing::Length(length) => {
                let wanted = *length - self.body.len();
                let n = wanted.min(buf.len());
                self.body.extend(buf.drain(..n));
                Ok(self.body.len() == *length)
            }
            Framing::Chunked(decoder) => {
                let (consumed, complete) = decoder.decode(buf, &mut self.body)?;
                buf.drain(..consumed);
                Ok(complete)
            }
            Framing::UntilClose => {
                self.body.append(buf);
                Ok(false)
            }
        }
    }

    /// Called at end of stream; only close-delimited bodies end cleanly
    fn finish(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        match self.framing {
            Framing::UntilClose => {
                self.body.append(buf);
                Ok(())
            }
            _ => Err(Error::Incomplete),
        }
    }

    fn into_bytes(self) -> Bytes {
        Bytes::from(self.body)
    }
}

/// Reads header lines into `headers` until the empty line.
/// Returns true once the header section is complete.
fn parse_header_lines(buf: &mut Vec<u8>, headers: &mut Headers) -> Result<bool> {
    while let Some(line) = take_line(buf)? {
        if line.is_empty() {
            return Ok(true);
        }
        if headers.len() >= MAX_HEADERS {
            return Err(Error::TooManyHeaders);
        }
        let (name, value) = Headers::parse_header_line(&line)?;
        headers.append(name, value);
    }
    Ok(false)
}

/// HTTP request parser
pub struct RequestParser {
    state: ParserState,
    buffer: Vec<u8>,
    start: Option<(Method, String, Version)>,
    headers: Headers,
    body: Option<BodyReader>,
}

impl RequestParser {
    /// Create a new request parser
    pub fn new() -> Self {
        RequestParser {
            state: ParserState::StartLine,
            buffer: Vec::new(),
            start: None,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Feed data to the parser
    ///
    /// Returns Ok(Some(request)) when a complete request is parsed,
    /// Ok(None) if more data is needed, or Err on parse error.
    pub fn parse(&mut self, data: &[u8]) -> Result<Option<IncomingRequest>> {
        self.buffer.extend_from_slice(data);

        loop {
            match self.state {
                ParserState::StartLine => {
                    let Some(line) = take_line(&mut self.buffer)? else {
                        return Ok(None);
                    };
                    // Tolerate stray CRLF between pipelined requests
                    if line.is_empty() {
                        continue;
                    }
                    self.start = Some(parse_request_line(&line)?);
                    self.state = ParserState::Headers;
                }
                ParserState::Headers => {
                    if !parse_header_lines(&mut self.buffer, &mut self.headers)? {
                        return Ok(None);
                    }
                    // Requests without length information have no body
                    let framing = Framing::from_headers(&self.headers)?.unwrap_or(Framing::Empty);
                    if matches!(framing, Framing::UntilClose) {
                        return Err(Error::Protocol(
                            "Unsupported request transfer coding".to_string(),
                        ));
                    }
                    self.body = Some(BodyReader::new(framing));
                    self.state = ParserState::Body;
                }
                ParserState::Body => {
                    let reader = self.body.as_mut().ok_or(Error::Incomplete)?;
                    if !reader.advance(&mut self.buffer)? {
                        return Ok(None);
                    }
                    self.state = ParserState::Complete;
                    return self.take_request().map(Some);
                }
                ParserState::Complete => return Ok(None),
            }
        }
    }

    fn take_request(&mut self) -> Result<IncomingRequest> {
        let (method, target, version) = self.start.take().ok_or(Error::Incomplete)?;
        let body = self.body.take().ok_or(Error::Incomplete)?;

        Ok(IncomingRequest {
            method,
            target,
            version,
            headers: std::mem::take(&mut self.headers),
            body: body.into_bytes(),
        })
    }

    /// Reset the parser for the next request, keeping any buffered bytes
    pub fn reset(&mut self) {
        self.state = ParserState::StartLine;
        self.start = None;
        self.headers.clear();
        self.body = None;
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP response parser
///
/// The method of the request being answered decides whether a body can
/// follow (responses to HEAD never carry one).
pub struct ResponseParser {
    state: ParserState,
    method: Method,
    buffer: Vec<u8>,
    start: Option<(Version, Status, String)>,
    headers: Headers,
    body: Option<BodyReader>,
}

impl ResponseParser {
    /// Create a new response parser for a GET request
    pub fn new() -> Self {
        Self::for_method(Method::Get)
    }

    /// Create a new response parser for a request with the given method
    pub fn for_method(method: Method) -> Self {
        ResponseParser {
            state: ParserState::StartLine,
            method,
            buffer: Vec::new(),
            start: None,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Feed data to the parser
    ///
    /// Returns Ok(Some(response)) when a complete response is parsed,
    /// Ok(None) if more data is needed, or Err on parse error.
    pub fn parse(&mut self, data: &[u8]) -> Result<Option<Response>> {
        self.buffer.extend_from_slice(data);

        loop {
            match self.state {
                ParserState::StartLine => {
                    let Some(line) = take_line(&mut self.buffer)? else {
                        return Ok(None);
                    };
                    self.start = Some(parse_status_line(&line)?);
                    self.state = ParserState::Headers;
                }
                ParserState::Headers => {
                    if !parse_header_lines(&mut self.buffer, &mut self.headers)? {
                        return Ok(None);
                    }
                    let status = self.start.as_ref().map(|(_, s, _)| *s).ok_or(Error::Incomplete)?;

                    // Interim 1xx responses precede the real one
                    if status.is_informational() && status.code() != 101 {
                        self.start = None;
                        self.headers.clear();
                        self.state = ParserState::StartLine;
                        continue;
                    }

                    self.body = Some(BodyReader::new(self.framing(status)?));
                    self.state = ParserState::Body;
                }
                ParserState::Body => {
                    let reader = self.body.as_mut().ok_or(Error::Incomplete)?;
                    if !reader.advance(&mut self.buffer)? {
                        return Ok(None);
                    }
                    self.state = ParserState::Complete;
                    return self.take_response().map(Some);
                }
                ParserState::Complete => return Ok(None),
            }
        }
    }

    /// Signal end of stream
    ///
    /// Completes a response whose body is delimited by connection close;
    /// any other partial response is an error.
    pub fn finish(&mut self) -> Result<Response> {
        match self.state {
            ParserState::Body => {
                let reader = self.body.as_mut().ok_or(Error::Incomplete)?;
                reader.finish(&mut self.buffer)?;
                self.state = ParserState::Complete;
                self.take_response()
            }
            ParserState::StartLine if self.start.is_none() && self.buffer.is_empty() => {
                Err(Error::ConnectionClosed)
            }
            _ => Err(Error::Incomplete),
        }
    }

    fn framing(&self, status: Status) -> Result<Framing> {
        if self.method == Method::Head || status.forbids_body() {
            return Ok(Framing::Empty);
        }
        Ok(Framing::from_headers(&self.headers)?.unwrap_or(Framing::UntilClose))
    }

    fn take_response(&mut self) -> Result<Response> {
        let (version, status, reason) = self.start.take().ok_or(Error::Incomplete)?;
        let body = self.body.take().ok_or(Error::Incomplete)?;

        Ok(Response::builder()
            .version(version)
            .status(status)
            .reason(reason)
            .headers(std::mem::take(&mut self.headers))
            .body(body.into_bytes())
            .build())
    }

    /// Reset the parser for reuse
    pub fn reset(&mut self, method: Method) {
        self.state = ParserState::StartLine;
        self.method = method;
        self.buffer.clear();
        self.start = None;
        self.headers.clear();
        self.body = None;
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let (method, target, version) = parse_request_line("GET /index.html HTTP/1.1").unwrap();
        assert_eq!(method, Method::Get);
        assert_eq!(target, "/index.html");
        assert_eq!(version, Version::Http11);

        assert!(parse_request_line("GET /index.html").is_err());
        assert!(parse_request_line("FETCH / HTTP/1.1").is_err());
    }

    #[test]
    fn test_parse_status_line() {
        let (version, status, reason) = parse_status_line("HTTP/1.1 302 Found").unwrap();
        assert_eq!(version, Version::Http11);
        assert_eq!(status.code(), 302);
        assert_eq!(reason, "Found");

        let (version, status, reason) = parse_status_line("HTTP/1.0 404").unwrap();
        assert_eq!(version, Version::Http10);
        assert_eq!(status.code(), 404);
        assert_eq!(reason, "Not Found");

        assert!(parse_status_line("HTTP/1.1 abc OK").is_err());
        assert!(parse_status_line("HTTP/1.1 700 Weird").is_err());
    }

    #[test]
    fn test_response_parser_content_length() {
        let mut parser = ResponseParser::new();
        let resp = parser
            .parse(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHello")
            .unwrap()
            .unwrap();

        assert_eq!(resp.status().code(), 200);
        assert_eq!(&resp.body()[..], b"Hello");
        assert_eq!(resp.headers().get("Content-Length"), Some("5"));
    }

    #[test]
    fn test_response_parser_incremental() {
        let mut parser = ResponseParser::new();

        assert!(parser.parse(b"HTTP/1.1 ").unwrap().is_none());
        assert!(parser.parse(b"200 OK\r\n").unwrap().is_none());
        assert!(parser.parse(b"Content-Type: text/plain\r\n").unwrap().is_none());
        assert!(parser.parse(b"Content-Length: 4\r\n\r\n").unwrap().is_none());
        assert!(parser.parse(b"Te").unwrap().is_none());
        let resp = parser.parse(b"st").unwrap().unwrap();

        assert_eq!(&resp.body()[..], b"Test");
        assert_eq!(resp.headers().get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_response_parser_chunked() {
        let mut parser = ResponseParser::new();
        assert!(parser
            .parse(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHel")
            .unwrap()
            .is_none());
        let resp = parser.parse(b"lo\r\n0\r\n\r\n").unwrap().unwrap();
        assert_eq!(&resp.body()[..], b"Hello");
    }

    #[test]
    fn test_response_parser_until_close() {
        let mut parser = ResponseParser::new();
        assert!(parser
            .parse(b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nsome ")
            .unwrap()
            .is_none());
        assert!(parser.parse(b"body").unwrap().is_none());

        let resp = parser.finish().unwrap();
        assert_eq!(resp.version(), Version::Http10);
        assert_eq!(resp.text(), "some body");
    }

    #[test]
    fn test_response_parser_redirect_without_body() {
        // 302 with no framing headers and a HEAD request: nothing to read
        let mut parser = ResponseParser::for_method(Method::Head);
        let resp = parser
            .parse(b"HTTP/1.1 302 Found\r\nLocation: /next\r\nContent-Length: 10\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(resp.location(), Some("/next"));
        assert!(resp.body().is_empty());

        let mut parser = ResponseParser::new();
        let resp = parser
            .parse(b"HTTP/1.1 304 Not Modified\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(resp.status().code(), 304);
    }

    #[test]
    fn test_response_parser_skips_interim() {
        let mut parser = ResponseParser::new();
        let wire = concat!(
            "HTTP/1.1 100 Continue\r\n\r\n",
            "HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok",
        );
        let resp = parser
            .parse(wire.as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(resp.status(), Status::CREATED);
        assert_eq!(resp.text(), "ok");
    }

    #[test]
    fn test_response_parser_truncated() {
        let mut parser = ResponseParser::new();
        assert!(parser.finish().is_err());

        let mut parser = ResponseParser::new();
        parser
            .parse(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort")
            .unwrap();
        assert!(matches!(parser.finish(), Err(Error::Incomplete)));
    }

    #[test]
    fn test_too_many_headers() {
        let mut raw = b"HTTP/1.1 200 OK\r\n".to_vec();
        for i in 0..=MAX_HEADERS {
            raw.extend_from_slice(format!("X-H-{}: v\r\n", i).as_bytes());
        }
        raw.extend_from_slice(b"\r\n");

        let mut parser = ResponseParser::new();
        assert!(matches!(parser.parse(&raw), Err(Error::TooManyHeaders)));
    }

    #[test]
    fn test_request_parser_with_body() {
        let mut parser = RequestParser::new();
        assert!(parser
            .parse(b"POST /fake?data=x HTTP/1.1\r\nHost: localhost\r\nContent-Length: 7\r\n\r\nfoo")
            .unwrap()
            .is_none());
        let req = parser.parse(b"-bar").unwrap().unwrap();

        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.target(), "/fake?data=x");
        assert_eq!(req.version(), Version::Http11);
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert_eq!(&req.body()[..], b"foo-bar");
    }

    #[test]
    fn test_request_parser_chunked_and_reset() {
        let mut parser = RequestParser::new();
        let wire = concat!(
            "PUT /up HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n",
            "GET /next HTTP/1.1\r\n\r\n",
        );
        let req = parser
            .parse(wire.as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(req.method(), Method::Put);
        assert_eq!(&req.body()[..], b"abc");

        parser.reset();
        let next = parser.parse(b"").unwrap().unwrap();
        assert_eq!(next.method(), Method::Get);
        assert_eq!(next.target(), "/next");
        assert!(next.body().is_empty());
    }
}
