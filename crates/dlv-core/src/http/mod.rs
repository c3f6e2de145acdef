//! Blocking HTTP GET over libcurl with cancellation.
//!
//! Callers construct one `HttpClient` with explicit timeouts and pass it
//! wherever a request is made; nothing in the crate builds a client on its
//! own. Runs in the current thread; call from `spawn_blocking` if used from
//! async code.

mod parse;

use crate::control::CancelToken;
use std::io::{self, Write};
use std::str;
use std::time::Duration;
use url::Url;

/// Transport-level failure: the request did not produce an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
    /// The response body could not be written to its destination.
    #[error("failed to write response body")]
    Write(#[source] io::Error),
    /// Curl reported an error (DNS, connection refused, timeout, TLS, ...).
    #[error(transparent)]
    Curl(#[from] curl::Error),
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Upper bound for a whole request, further capped by the token's deadline.
    pub timeout: Duration,
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(300),
            max_redirects: 10,
            user_agent: concat!("dlv/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Status and the headers we care about from the final response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    /// Raw `Content-Type` value, if present.
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lower-cased media type without parameters, e.g. `application/pgp-keys`.
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().and_then(parse::media_type)
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub head: ResponseHead,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    options: HttpOptions,
}

impl HttpClient {
    pub fn new(options: HttpOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    /// GET `url` and buffer the body in memory.
    pub fn get(&self, url: &Url, cancel: &CancelToken) -> Result<HttpResponse, TransportError> {
        let mut body = Vec::new();
        let head = self.get_into(url, cancel, &mut body)?;
        Ok(HttpResponse { head, body })
    }

    /// GET `url`, streaming the body into `sink`.
    ///
    /// Any status code is returned as a response; only failures to obtain one
    /// are errors. Follows redirects.
    pub fn get_into<W: Write>(
        &self,
        url: &Url,
        cancel: &CancelToken,
        sink: &mut W,
    ) -> Result<ResponseHead, TransportError> {
        if let Some(e) = cancellation(cancel) {
            return Err(e);
        }

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(self.options.max_redirects)?;
        easy.useragent(&self.options.user_agent)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(request_timeout(self.options.timeout, cancel))?;
        easy.progress(true)?;

        let mut headers: Vec<String> = Vec::new();
        let mut write_error: Option<io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    // A new status line starts the next response in a redirect chain.
                    if line.starts_with("HTTP/") {
                        headers.clear();
                    }
                    headers.push(line.to_string());
                }
                true
            })?;
            transfer.write_function(|data| match sink.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_done())?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if let Some(io_err) = write_error.take() {
                return Err(TransportError::Write(io_err));
            }
            if let Some(c) = cancellation(cancel) {
                return Err(c);
            }
            return Err(TransportError::Curl(e));
        }

        let status = easy.response_code()?;
        tracing::debug!(url = %url, status, "GET complete");
        Ok(parse::parse_headers(status, &headers))
    }
}

fn cancellation(cancel: &CancelToken) -> Option<TransportError> {
    if cancel.is_cancelled() {
        Some(TransportError::Cancelled)
    } else if cancel.deadline_exceeded() {
        Some(TransportError::DeadlineExceeded)
    } else {
        None
    }
}

/// Per-request timeout: the client limit, capped by the token's deadline.
/// Never zero, which curl would read as "no timeout".
fn request_timeout(limit: Duration, cancel: &CancelToken) -> Duration {
    match cancel.remaining() {
        Some(left) => left.min(limit).max(Duration::from_millis(1)),
        None => limit,
    }
}
