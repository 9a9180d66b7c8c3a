//! Redirect policy
//!
//! Decides, for one response, whether the chain continues and what the
//! next request looks like. Everything here is a pure function of the
//! options, the request that was sent and the response it got, so the
//! rules can be tested without any I/O.
//!
//! | status | method and body on the next hop |
//! |---|---|
//! | 301 Moved Permanently | preserved with strict redirect, otherwise GET without body |
//! | 302 Found | preserved with strict redirect, otherwise GET without body |
//! | 303 See Other | always GET without body |
//! | 307 Temporary Redirect | always preserved |
//! | 308 Permanent Redirect | always preserved |
//! | 201 Created (opt-in) | always GET without body |
//!
//! Only headers named in the options' follow list are carried over; the
//! next request starts from an empty header set.

use super::{ClientOptions, Headers, Method, Request, Response, Status};
use url::Url;

/// Statuses the client knows how to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectStatus {
    Created,
    MovedPermanently,
    Found,
    SeeOther,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectStatus {
    /// All recognized statuses
    pub const ALL: [RedirectStatus; 6] = [
        RedirectStatus::Created,
        RedirectStatus::MovedPermanently,
        RedirectStatus::Found,
        RedirectStatus::SeeOther,
        RedirectStatus::TemporaryRedirect,
        RedirectStatus::PermanentRedirect,
    ];

    /// Map a response status onto a redirect status
    pub fn from_status(status: Status) -> Option<Self> {
        match status.code() {
            201 => Some(RedirectStatus::Created),
            301 => Some(RedirectStatus::MovedPermanently),
            302 => Some(RedirectStatus::Found),
            303 => Some(RedirectStatus::SeeOther),
            307 => Some(RedirectStatus::TemporaryRedirect),
            308 => Some(RedirectStatus::PermanentRedirect),
            _ => None,
        }
    }

    /// The status code
    pub fn status(self) -> Status {
        match self {
            RedirectStatus::Created => Status::CREATED,
            RedirectStatus::MovedPermanently => Status::MOVED_PERMANENTLY,
            RedirectStatus::Found => Status::FOUND,
            RedirectStatus::SeeOther => Status::SEE_OTHER,
            RedirectStatus::TemporaryRedirect => Status::TEMPORARY_REDIRECT,
            RedirectStatus::PermanentRedirect => Status::PERMANENT_REDIRECT,
        }
    }

    /// How the method and body of the next hop are derived
    pub fn method_rule(self, strict: Option<bool>) -> MethodRule {
        match (self, strict) {
            (RedirectStatus::MovedPermanently | RedirectStatus::Found, Some(true)) => {
                MethodRule::Preserve
            }
            (RedirectStatus::MovedPermanently | RedirectStatus::Found, _) => {
                MethodRule::RewriteToGet
            }
            (RedirectStatus::SeeOther | RedirectStatus::Created, _) => MethodRule::RewriteToGet,
            (RedirectStatus::TemporaryRedirect | RedirectStatus::PermanentRedirect, _) => {
                MethodRule::Preserve
            }
        }
    }
}

/// Method/body transformation applied when following
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodRule {
    /// Same method; body carried unless the method is GET or HEAD
    Preserve,
    /// GET with an empty body
    RewriteToGet,
}

/// Why a chain stopped at a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Status is not a recognized redirect
    NotRedirect,
    /// Following is disabled in the options
    FollowDisabled,
    /// Redirect status without a (non-empty) Location header
    MissingLocation,
    /// Location does not resolve to an http or https URL
    MalformedLocation,
}

/// Outcome of [`decide_next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Return the response to the caller as-is
    Stop(StopReason),
    /// Send this request next
    Follow(Request),
}

/// Decide what happens after `response` was received for `current`
pub fn decide_next(options: &ClientOptions, current: &Request, response: &Response) -> NextAction {
    let Some(redirect) = options.recognize(response.status()) else {
        return NextAction::Stop(StopReason::NotRedirect);
    };

    if !options.follow() {
        return NextAction::Stop(StopReason::FollowDisabled);
    }

    let location = match response.location().map(str::trim) {
        Some(location) if !location.is_empty() => location,
        _ => return NextAction::Stop(StopReason::MissingLocation),
    };

    let Some(url) = resolve_location(current.url(), location) else {
        return NextAction::Stop(StopReason::MalformedLocation);
    };

    let mut next = match redirect.method_rule(options.strict_redirect()) {
        MethodRule::Preserve => {
            let mut next = Request::new(current.method(), url);
            if !matches!(current.method(), Method::Get | Method::Head) {
                next.set_body(current.body().clone());
            }
            next
        }
        MethodRule::RewriteToGet => Request::new(Method::Get, url),
    };

    *next.headers_mut() = forwarded_headers(options, current.headers());
    NextAction::Follow(next)
}

/// Resolve a Location value against the URL of the request that got it
///
/// Absolute references replace the URL; relative ones (including
/// scheme-relative and query-only references) resolve per RFC 3986.
pub fn resolve_location(base: &Url, location: &str) -> Option<Url> {
    base.join(location)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

/// Headers of the current request that the options carry forward
fn forwarded_headers(options: &ClientOptions, headers: &Headers) -> Headers {
    let mut forwarded = Headers::new();
    for (name, value) in headers.iter() {
        if options.forwards_header(name) {
            forwarded.append(name, value);
        }
    }
    forwarded
}
