//! GPG key identifiers and key-server resolution.
//!
//! Only key resolution is implemented; checking a detached signature with
//! the downloaded key is not.

pub mod download;
mod error;
mod key_id;
mod keyserver;

pub use download::{DownloadedKey, KeyDownloader, RetryReason};
pub use error::KeyDownloadError;
pub use key_id::{InvalidKeyReason, KeyError, KeyId, KeyLength};
pub use keyserver::{InvalidKeyServer, KeyServerInformation, DEFAULT_KEY_SERVERS, HKP_PORT};
