//! Combined outcome of one verification run, as shown to the user.

use serde::Serialize;
use url::Url;

use crate::checksum::VerificationResult;
use crate::gpg::{DownloadedKey, KeyId};

/// The key resolved for the run and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySummary {
    pub key_id: KeyId,
    pub server: String,
}

impl KeySummary {
    pub fn new(key_id: KeyId, downloaded: &DownloadedKey) -> Self {
        Self {
            key_id,
            server: downloaded.server.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one check passed and none failed.
    Verified,
    /// A requested checksum did not match.
    ChecksumMismatch,
    /// Nothing was checked, so nothing can be claimed.
    Unverified,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub url: String,
    pub checksums: VerificationResult,
    /// Present when a signing key was requested and resolved.
    pub signing_key: Option<KeySummary>,
    pub outcome: Outcome,
    pub message: String,
}

impl Report {
    /// A resolved key is reported but does not count as verification: no
    /// signature is checked against it.
    pub fn new(url: &Url, checksums: VerificationResult, signing_key: Option<KeySummary>) -> Self {
        let outcome = if checksums.is_invalid() {
            Outcome::ChecksumMismatch
        } else if checksums.is_valid() {
            Outcome::Verified
        } else {
            Outcome::Unverified
        };
        let message = match outcome {
            Outcome::Unverified => format!(
                "{}. No verification was done, cannot assert the validity of the file",
                checksums.to_message()
            ),
            _ => checksums.to_message(),
        };
        Self {
            url: url.to_string(),
            checksums,
            signing_key,
            outcome,
            message,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.outcome == Outcome::Verified
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
