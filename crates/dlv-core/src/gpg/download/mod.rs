//! Fetch a public key by id from the first key server that has it.
//!
//! Candidates are visited one at a time in resolver order. A server that
//! lacks the key or answers oddly is skipped; a transport failure or an
//! ambiguous answer (several keys for one id) stops the walk at once.

mod outcome;

pub use outcome::{parse_keyring, CandidateOutcome, RetryReason, PGP_KEYS_MEDIA_TYPE};

use pgp::composed::SignedPublicKey;
use std::ops::ControlFlow;
use url::Url;

use super::error::KeyDownloadError;
use super::key_id::KeyId;
use super::keyserver::KeyServerInformation;
use crate::control::CancelToken;
use crate::http::HttpClient;

/// Path of the HKP lookup endpoint.
pub const LOOKUP_PATH: &str = "/pks/lookup";

/// A key and the server that supplied it.
#[derive(Debug, Clone)]
pub struct DownloadedKey {
    pub key: SignedPublicKey,
    /// Base URL of the candidate that answered.
    pub server: Url,
}

impl DownloadedKey {
    pub fn primary_key(&self) -> &pgp::packet::PublicKey {
        &self.key.primary_key
    }
}

/// Key-server client. Needs an explicit HTTP client and cancellation token.
#[derive(Debug, Clone)]
pub struct KeyDownloader {
    client: HttpClient,
    cancel: CancelToken,
}

impl KeyDownloader {
    pub fn new(client: HttpClient, cancel: CancelToken) -> Self {
        Self { client, cancel }
    }

    /// Resolve `key` using the servers and protocols in `servers`.
    pub fn download_key(
        &self,
        servers: &KeyServerInformation,
        key: &KeyId,
    ) -> Result<DownloadedKey, KeyDownloadError> {
        servers.validate()?;
        self.download_key_from(&servers.key_server_urls(), key)
    }

    /// Resolve `key` by trying `candidates` (base URLs) in order.
    pub fn download_key_from(
        &self,
        candidates: &[Url],
        key: &KeyId,
    ) -> Result<DownloadedKey, KeyDownloadError> {
        let key = key.clean()?;
        let mut last_retryable: Option<RetryReason> = None;

        for server in candidates {
            let url = lookup_url(server, &key);
            match self.query(&url).into_step() {
                ControlFlow::Break(Ok(found)) => {
                    tracing::info!(url = %url, key = %key, "key downloaded");
                    return Ok(DownloadedKey {
                        key: found,
                        server: server.clone(),
                    });
                }
                ControlFlow::Break(Err(e)) => {
                    tracing::error!(url = %url, error = ?e, "key download aborted");
                    return Err(e);
                }
                ControlFlow::Continue(reason) => {
                    tracing::info!(
                        url = %url,
                        error = %reason,
                        "download failed, trying another server"
                    );
                    last_retryable = Some(reason);
                }
            }
        }

        match last_retryable {
            Some(last) => {
                tracing::error!(error = %last, "all servers failed to provide key");
                Err(KeyDownloadError::AllServersFailed {
                    attempts: candidates.len(),
                    last,
                })
            }
            None => Err(KeyDownloadError::NoKeyServers),
        }
    }

    fn query(&self, url: &Url) -> CandidateOutcome {
        match self.client.get(url, &self.cancel) {
            Ok(response) => CandidateOutcome::from_response(url, &response),
            Err(source) => CandidateOutcome::Fatal(KeyDownloadError::Transport {
                url: url.clone(),
                source,
            }),
        }
    }
}

/// Machine-readable exact lookup of `key` on the server at `base`.
pub fn lookup_url(base: &Url, key: &KeyId) -> Url {
    let mut url = base.clone();
    url.set_path(LOOKUP_PATH);
    url.query_pairs_mut()
        .clear()
        .append_pair("op", "get")
        .append_pair("search", &format!("0x{}", key))
        .append_pair("exact", "on")
        .append_pair("options", "mr");
    url
}
