//! hopclient - HTTP/1.1 client with configurable redirect following
//!
//! This crate provides an HTTP client that drives redirect chains according
//! to explicit, per-request policy, together with the HTTP/1.1 wire layer
//! (plain TCP and TLS) it runs on.

pub mod http;
