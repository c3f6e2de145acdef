//! Checksum verification of a downloaded file against caller-supplied digests.
//!
//! Each requested algorithm re-opens the file by path and streams it through
//! its own hasher. Nothing guards against the file changing between passes;
//! callers should hold the only handle to the download directory.

mod error;
mod result;

pub use error::{ChecksumConfigError, ChecksumError};
pub use result::VerificationResult;

use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Supported digest algorithms, strongest first. The declaration order is
/// the order in which algorithms are checked and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "SHA512")]
    Sha512,
    #[serde(rename = "SHA384")]
    Sha384,
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA224")]
    Sha224,
    #[serde(rename = "SHA1")]
    Sha1,
    #[serde(rename = "MD5")]
    Md5,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 6] = [
        DigestAlgorithm::Sha512,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Md5,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha512 => "SHA512",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha224 => "SHA224",
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Md5 => "MD5",
        }
    }

    /// Digest output size in bytes.
    pub fn byte_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha512 => 64,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Md5 => 16,
        }
    }

    /// Length of the digest rendered as hex.
    pub fn hex_len(self) -> usize {
        self.byte_len() * 2
    }

    /// Fresh incremental hasher for this algorithm.
    pub fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            DigestAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
            DigestAlgorithm::Sha384 => Box::new(sha2::Sha384::default()),
            DigestAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            DigestAlgorithm::Sha224 => Box::new(sha2::Sha224::default()),
            DigestAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            DigestAlgorithm::Md5 => Box::new(md5::Md5::default()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compute the digest of a file and return it as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn hash_path(path: &Path, algorithm: DigestAlgorithm) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = algorithm.hasher();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Digests the caller expects, one optional value per algorithm.
///
/// Values are stored lower-cased. An empty value means "not requested".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedDigests {
    entries: BTreeMap<DigestAlgorithm, String>,
}

impl ExpectedDigests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ExpectedDigests::set`].
    pub fn with(mut self, algorithm: DigestAlgorithm, value: impl AsRef<str>) -> Self {
        self.set(algorithm, value);
        self
    }

    /// Request `algorithm` with the given hex value; an empty value clears it.
    pub fn set(&mut self, algorithm: DigestAlgorithm, value: impl AsRef<str>) {
        let value = value.as_ref();
        if value.is_empty() {
            self.entries.remove(&algorithm);
        } else {
            self.entries.insert(algorithm, value.to_lowercase());
        }
    }

    pub fn get(&self, algorithm: DigestAlgorithm) -> Option<&str> {
        self.entries.get(&algorithm).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DigestAlgorithm, &str)> {
        self.entries.iter().map(|(a, v)| (*a, v.as_str()))
    }

    /// Check every requested digest is hex of the right length for its algorithm.
    pub fn validate(&self) -> Result<(), ChecksumConfigError> {
        for (algorithm, value) in self.iter() {
            if value.len() != algorithm.hex_len() {
                return Err(ChecksumConfigError::InvalidHashLength {
                    algorithm,
                    expected_len: algorithm.hex_len(),
                    actual_len: value.len(),
                    value: value.to_string(),
                });
            }
            if hex::decode(value).is_err() {
                return Err(ChecksumConfigError::InvalidHashCharacters {
                    algorithm,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Hash the file at `path` once per requested algorithm and compare.
    ///
    /// The first I/O failure aborts the whole pass.
    pub fn verify_path(&self, path: &Path) -> Result<VerificationResult, ChecksumError> {
        let mut result = VerificationResult::default();
        for (algorithm, expected) in self.iter() {
            let actual = hash_path(path, algorithm).map_err(|source| {
                tracing::error!(
                    path = %path.display(),
                    %algorithm,
                    error = %source,
                    "failed to hash file"
                );
                ChecksumError {
                    algorithm,
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            let matches = actual == expected;
            tracing::info!(
                path = %path.display(),
                %algorithm,
                value = %actual,
                matches,
                "checksum generated"
            );
            result.record(algorithm, matches);
        }
        Ok(result)
    }
}
