//! Errors from resolving a key through the key servers.

use url::Url;

use super::download::RetryReason;
use super::key_id::KeyError;
use super::keyserver::InvalidKeyServer;
use crate::http::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum KeyDownloadError {
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
    #[error(transparent)]
    InvalidKeyServer(#[from] InvalidKeyServer),
    /// No HTTP response at all. Not retried on other servers.
    #[error("request to {url} failed")]
    Transport {
        url: Url,
        #[source]
        source: TransportError,
    },
    /// The key id matches several keys; picking one would defeat the check.
    #[error("{url} returned {count} keys, verify the given key id or fingerprint")]
    MultipleKeysReturned { url: Url, count: usize },
    #[error("no key servers to query")]
    NoKeyServers,
    /// Every candidate answered with a retryable failure.
    #[error("all {attempts} key server request(s) failed to provide the key; last error: {last}")]
    AllServersFailed { attempts: usize, last: RetryReason },
}
