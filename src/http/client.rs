//! HTTP client
//!
//! Drives a request through its redirect chain: send over the transport,
//! ask [`decide_next`] what to do with the response, repeat until the
//! policy stops or the hop bound is hit.

use super::redirect::{decide_next, NextAction, StopReason};
use super::{ClientOptions, Error, Request, Response, TcpTransport, Transport};
use url::Url;

/// Errors returned by [`HttpClient`]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[source] Error),

    #[error("Transport error: {0}")]
    Transport(#[source] Error),

    #[error("Too many redirects (max {max_redirects}), next hop was {url}")]
    TooManyRedirects { max_redirects: usize, url: Url },
}

/// HTTP client
///
/// Stateless apart from its transport and default options, so a shared
/// client can run chains from several threads when the transport allows.
#[derive(Debug, Clone)]
pub struct HttpClient<T = TcpTransport> {
    transport: T,
    options: ClientOptions,
}

impl HttpClient<TcpTransport> {
    /// Client over a default-configured TCP transport
    pub fn tcp() -> Self {
        HttpClient::new(TcpTransport::default())
    }
}

impl<T: Transport> HttpClient<T> {
    /// Create a client with default options
    pub fn new(transport: T) -> Self {
        HttpClient {
            transport,
            options: ClientOptions::default(),
        }
    }

    /// Replace the options used by [`send`](Self::send)
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Default options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute a request with the client's default options
    pub fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.execute(request, &self.options)
    }

    /// GET an absolute URL
    pub fn get(&self, url: &str, options: &ClientOptions) -> Result<Response, ClientError> {
        let request = Request::get(url).map_err(ClientError::InvalidRequest)?;
        self.execute(request, options)
    }

    /// Execute a request, following redirects as `options` allow
    ///
    /// The returned response carries the URL it was fetched from and the
    /// URLs redirected away from on the way.
    pub fn execute(
        &self,
        request: Request,
        options: &ClientOptions,
    ) -> Result<Response, ClientError> {
        let mut current = request;
        let mut trail: Vec<Url> = Vec::new();

        loop {
            log::debug!("{} {} (hop {})", current.method(), current.url(), trail.len());

            let response = self.transport.send(&current).map_err(|e| {
                log::warn!("{} {} failed: {}", current.method(), current.url(), e);
                ClientError::Transport(e)
            })?;

            let next = match decide_next(options, &current, &response) {
                NextAction::Stop(reason) => {
                    log_stop(reason, &current, &response);
                    return Ok(response.with_trail(current.url().clone(), trail));
                }
                NextAction::Follow(next) => next,
            };

            if trail.len() >= options.max_redirects() {
                log::warn!(
                    "Giving up on {} after {} redirects",
                    trail.first().unwrap_or(current.url()),
                    trail.len()
                );
                return Err(ClientError::TooManyRedirects {
                    max_redirects: options.max_redirects(),
                    url: next.url().clone(),
                });
            }

            log::debug!(
                "{} from {} -> {} {}",
                response.status(),
                current.url(),
                next.method(),
                next.url()
            );

            let previous = std::mem::replace(&mut current, next);
            trail.push(previous.url().clone());
        }
    }
}

fn log_stop(reason: StopReason, current: &Request, response: &Response) {
    match reason {
        StopReason::NotRedirect => {}
        StopReason::FollowDisabled => {
            log::debug!("Not following {} from {}", response.status(), current.url());
        }
        StopReason::MissingLocation | StopReason::MalformedLocation => {
            log::warn!(
                "Not following {} from {}: {:?} (Location: {:?})",
                response.status(),
                current.url(),
                reason,
                response.location()
            );
        }
    }
}
