//! Echo fixture shared by the integration tests
//!
//! `/fake?data=<json>` answers with the status, headers and body described
//! by the JSON, and reports back what the request looked like:
//!
//! ```text
//! {"body": "...", "rq_headers": {...}, "rq_body": "..." | null, "rq_method": "POST"}
//! ```

#![allow(dead_code)]

use hopclient::http::tls::TlsConfig;
use hopclient::http::{
    FdSessionOps, Headers, HttpServer, IncomingRequest, Response, SessionOps, Status,
};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509NameBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

/// Bound on how long the fixture waits for a stalled client
const FIXTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the fixture should answer with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Fake {
    pub status: u16,
    pub header: BTreeMap<String, String>,
    pub body: Option<String>,
    pub chunked: bool,
}

impl Default for Fake {
    fn default() -> Self {
        Fake {
            status: 200,
            header: BTreeMap::new(),
            body: None,
            chunked: false,
        }
    }
}

impl Fake {
    pub fn status(status: u16) -> Self {
        Fake {
            status,
            ..Fake::default()
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.header.insert(name.to_string(), value.into());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Path and query addressing this answer on any fixture
    pub fn path(&self) -> String {
        let json = serde_json::to_string(self).unwrap();
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("data", &json)
            .finish();
        format!("/fake?{}", query)
    }
}

/// What the fixture saw, as reported in its response body
#[derive(Debug, Deserialize)]
pub struct Echo {
    pub body: String,
    pub rq_headers: BTreeMap<String, String>,
    pub rq_body: Option<String>,
    pub rq_method: String,
}

impl Echo {
    pub fn from_response(response: &Response) -> Echo {
        serde_json::from_slice(response.body()).unwrap_or_else(|e| {
            panic!("response is not an echo ({}): {:?}", e, response.text())
        })
    }
}

/// Running echo fixture; serves until the test process exits
pub struct EchoServer {
    addr: SocketAddr,
    scheme: &'static str,
}

impl EchoServer {
    pub fn start() -> EchoServer {
        init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(HttpServer::new(FdSessionOps::new(stream)));
            }
        });

        EchoServer {
            addr,
            scheme: "http",
        }
    }

    pub fn start_tls(config: TlsConfig) -> EchoServer {
        init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                // Clients that reject the certificate fail the handshake
                match config.accept(stream) {
                    Ok(session) => serve(HttpServer::new(session)),
                    Err(e) => log::debug!("fixture handshake failed: {}", e),
                }
            }
        });

        EchoServer {
            addr,
            scheme: "https",
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for a path on this fixture
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }

    /// Absolute URL answering with `fake`
    pub fn fake(&self, fake: &Fake) -> String {
        self.url(&fake.path())
    }
}

fn serve<S: SessionOps>(mut server: HttpServer<S>) {
    server.set_timeout(FIXTURE_TIMEOUT);
    // The client closes after every exchange; a keep-alive client would loop here
    match server.receive_request() {
        Ok(request) => {
            if let Err(e) = respond(&mut server, &request) {
                log::debug!("fixture failed to respond: {}", e);
            }
        }
        Err(e) => log::debug!("fixture failed to read request: {}", e),
    }
    let _ = server.close();
}

fn respond<S: SessionOps>(
    server: &mut HttpServer<S>,
    request: &IncomingRequest,
) -> hopclient::http::Result<()> {
    if request.path() != "/fake" {
        return server.send_error(Status::NOT_FOUND, "unknown fixture path");
    }

    let fake = request
        .query()
        .and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(name, _)| name == "data")
                .map(|(_, value)| value.into_owned())
        })
        .and_then(|data| serde_json::from_str::<Fake>(&data).ok());

    let Some(fake) = fake else {
        return server.send_error(Status::BAD_REQUEST, "missing or invalid data parameter");
    };

    let mut rq_headers = BTreeMap::new();
    for (name, value) in request.headers().iter() {
        rq_headers
            .entry(name.to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let rq_body = if request.body().is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(request.body()).into_owned())
    };

    let echo = serde_json::json!({
        "body": fake.body.as_deref().unwrap_or("ok"),
        "rq_headers": rq_headers,
        "rq_body": rq_body,
        "rq_method": request.method().as_str(),
    })
    .to_string();

    let status = Status::new(fake.status)?;
    let mut headers: Headers = fake.header.iter().collect();
    headers.insert("Content-Type", "application/json");

    if fake.chunked {
        let (head, tail) = echo.as_bytes().split_at(echo.len() / 2);
        return server.send_chunked_response(status, &headers, &[head, tail]);
    }

    let response = Response::builder()
        .status(status)
        .headers(headers)
        .body(echo)
        .build();
    server.send_response(&response)
}

/// Self-signed certificate for 127.0.0.1 and localhost, as (cert, key) PEM
pub fn self_signed_cert() -> (Vec<u8>, Vec<u8>) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();

    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    let cert = builder.build();
    (
        cert.to_pem().unwrap(),
        key.private_key_to_pem_pkcs8().unwrap(),
    )
}

/// TLS fixture configuration for a freshly generated certificate
pub fn server_tls(cert: &[u8], key: &[u8]) -> TlsConfig {
    TlsConfig::server()
        .unwrap()
        .cert_pem(cert, key)
        .unwrap()
        .build()
        .unwrap()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
