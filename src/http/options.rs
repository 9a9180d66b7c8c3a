//! Client options
//!
//! Options are supplied once per top-level request and apply to every hop
//! of its redirect chain.

use super::redirect::RedirectStatus;
use super::{Status, DEFAULT_MAX_REDIRECTS};
use std::collections::BTreeSet;

/// Redirect-following options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    follow: bool,
    follow_headers: BTreeSet<String>,
    strict_redirect: Option<bool>,
    max_redirects: usize,
    follow_created: bool,
}

impl ClientOptions {
    /// Create a builder starting from the defaults
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Whether redirects are followed at all
    pub fn follow(&self) -> bool {
        self.follow
    }

    /// Lower-cased names of the headers carried to redirected requests
    pub fn follow_headers(&self) -> impl Iterator<Item = &str> {
        self.follow_headers.iter().map(String::as_str)
    }

    /// Whether a header of the current request is carried to the next hop
    pub fn forwards_header(&self, name: &str) -> bool {
        self.follow_headers.contains(&name.to_ascii_lowercase())
    }

    /// `Some(true)` preserves method and body on 301/302, `Some(false)`
    /// rewrites them to GET, `None` uses the default per status
    pub fn strict_redirect(&self) -> Option<bool> {
        self.strict_redirect
    }

    /// Maximum number of redirects followed in one chain
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Whether 201 Created with a Location is followed
    pub fn follow_created(&self) -> bool {
        self.follow_created
    }

    /// The redirect status a response status maps to under these options
    pub fn recognize(&self, status: Status) -> Option<RedirectStatus> {
        match RedirectStatus::from_status(status)? {
            RedirectStatus::Created if !self.follow_created => None,
            redirect => Some(redirect),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions::builder().build()
    }
}

/// Builder for [`ClientOptions`]
#[derive(Debug)]
pub struct ClientOptionsBuilder {
    follow: bool,
    follow_headers: BTreeSet<String>,
    strict_redirect: Option<bool>,
    max_redirects: usize,
    follow_created: bool,
}

impl Default for ClientOptionsBuilder {
    fn default() -> Self {
        ClientOptionsBuilder {
            follow: true,
            follow_headers: BTreeSet::new(),
            strict_redirect: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            follow_created: false,
        }
    }
}

impl ClientOptionsBuilder {
    /// Follow redirects (default true)
    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Carry a header to redirected requests; matched case-insensitively
    pub fn follow_header(mut self, name: impl AsRef<str>) -> Self {
        self.follow_headers.insert(name.as_ref().to_ascii_lowercase());
        self
    }

    /// Carry several headers to redirected requests
    pub fn follow_headers<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        self.follow_headers
            .extend(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        self
    }

    /// Strict redirect mode; accepts `bool` or `Option<bool>`
    pub fn strict_redirect(mut self, strict: impl Into<Option<bool>>) -> Self {
        self.strict_redirect = strict.into();
        self
    }

    /// Bound on redirects per chain (default 20)
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Follow 201 Created responses that carry a Location (default false)
    pub fn follow_created(mut self, follow: bool) -> Self {
        self.follow_created = follow;
        self
    }

    pub fn build(self) -> ClientOptions {
        ClientOptions {
            follow: self.follow,
            follow_headers: self.follow_headers,
            strict_redirect: self.strict_redirect,
            max_redirects: self.max_redirects,
            follow_created: self.follow_created,
        }
    }
}
