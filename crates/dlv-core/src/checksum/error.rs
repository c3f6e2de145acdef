//! Error types for checksum input validation and file hashing.

use std::path::PathBuf;

use super::DigestAlgorithm;

/// A caller-supplied digest is malformed. Raised before anything is downloaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumConfigError {
    #[error(
        "given {algorithm} hash expects a hexadecimal string of length {expected_len}, \
         got length {actual_len}: `{value}'"
    )]
    InvalidHashLength {
        algorithm: DigestAlgorithm,
        expected_len: usize,
        actual_len: usize,
        value: String,
    },
    #[error("given {algorithm} hash is not a valid hexadecimal value: `{value}'")]
    InvalidHashCharacters {
        algorithm: DigestAlgorithm,
        value: String,
    },
}

/// Hashing a file failed. Partial results are discarded.
#[derive(Debug, thiserror::Error)]
#[error("failed to compute {algorithm} of {}", .path.display())]
pub struct ChecksumError {
    pub algorithm: DigestAlgorithm,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
