//! Single-stream HTTP GET of the artifact into a scratch directory.
//!
//! One request, no retry: the file is verified afterwards, so a bad transfer
//! shows up as a checksum failure rather than being papered over here.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use url::Url;

use crate::control::CancelToken;
use crate::http::HttpClient;

/// Default filename when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// GET `url` into `dir`, returning the path of the written file.
pub fn download_to_dir(
    client: &HttpClient,
    url: &Url,
    dir: &Path,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let path = dir.join(filename_from_url(url));
    tracing::debug!(url = %url, path = %path.display(), "downloading to temporary file");

    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let head = client
        .get_into(url, cancel, &mut out)
        .with_context(|| format!("GET {} failed", url))?;
    out.flush()
        .with_context(|| format!("write {}", path.display()))?;

    if !head.is_success() {
        anyhow::bail!("GET {} returned HTTP {}", url, head.status);
    }
    tracing::info!(url = %url, path = %path.display(), "download complete");
    Ok(path)
}

/// Last path segment of `url`, made safe as a single filename.
pub fn filename_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or("");
    let sanitized: String = segment
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let sanitized = sanitized.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized.to_string()
    }
}
