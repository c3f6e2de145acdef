//! Classify one key-server response into found / retry elsewhere / stop.

use pgp::composed::{Deserializable, SignedPublicKey};
use std::fmt;
use std::ops::ControlFlow;
use url::Url;

use crate::gpg::error::KeyDownloadError;
use crate::http::HttpResponse;

pub const PGP_KEYS_MEDIA_TYPE: &str = "application/pgp-keys";

/// A server-side failure that another key server may not share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// Non-2xx status.
    KeyNotFound { status: u32 },
    /// 2xx with a keyring holding no keys.
    EmptyKeyring,
    /// Media type missing or not `application/pgp-keys`.
    UnexpectedContentType(Option<String>),
    /// Body is not a parseable armored keyring.
    MalformedKeyring(String),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::KeyNotFound { status } => {
                write!(f, "specified key was not found on server (HTTP {})", status)
            }
            RetryReason::EmptyKeyring => write!(f, "specified key was not found on server"),
            RetryReason::UnexpectedContentType(Some(ct)) => {
                write!(f, "server did not return the expected content type (got {})", ct)
            }
            RetryReason::UnexpectedContentType(None) => {
                write!(f, "server did not return the expected content type")
            }
            RetryReason::MalformedKeyring(e) => {
                write!(f, "server returned a malformed keyring: {}", e)
            }
        }
    }
}

impl RetryReason {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RetryReason::KeyNotFound { .. } | RetryReason::EmptyKeyring)
    }
}

/// Result of asking a single key server.
#[derive(Debug)]
pub enum CandidateOutcome {
    Found(SignedPublicKey),
    Retryable(RetryReason),
    Fatal(KeyDownloadError),
}

impl CandidateOutcome {
    /// Classify a response received from `url`.
    pub fn from_response(url: &Url, response: &HttpResponse) -> Self {
        let head = &response.head;
        if !head.is_success() {
            return CandidateOutcome::Retryable(RetryReason::KeyNotFound {
                status: head.status,
            });
        }
        if head.media_type().as_deref() != Some(PGP_KEYS_MEDIA_TYPE) {
            return CandidateOutcome::Retryable(RetryReason::UnexpectedContentType(
                head.content_type.clone(),
            ));
        }
        let mut keys = match parse_keyring(&response.body) {
            Ok(keys) => keys,
            Err(e) => return CandidateOutcome::Retryable(RetryReason::MalformedKeyring(e)),
        };
        match keys.len() {
            0 => CandidateOutcome::Retryable(RetryReason::EmptyKeyring),
            1 => CandidateOutcome::Found(keys.remove(0)),
            count => CandidateOutcome::Fatal(KeyDownloadError::MultipleKeysReturned {
                url: url.clone(),
                count,
            }),
        }
    }

    /// Loop policy: stop on a key or a fatal error, otherwise move on.
    pub fn into_step(self) -> ControlFlow<Result<SignedPublicKey, KeyDownloadError>, RetryReason> {
        match self {
            CandidateOutcome::Found(key) => ControlFlow::Break(Ok(key)),
            CandidateOutcome::Fatal(e) => ControlFlow::Break(Err(e)),
            CandidateOutcome::Retryable(reason) => ControlFlow::Continue(reason),
        }
    }
}

/// Parse an ASCII-armored keyring. A blank body holds no keys.
pub fn parse_keyring(body: &[u8]) -> Result<Vec<SignedPublicKey>, String> {
    let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let (keys, _headers) = SignedPublicKey::from_string_many(text).map_err(|e| e.to_string())?;
    keys.map(|k| k.map_err(|e| e.to_string())).collect()
}
