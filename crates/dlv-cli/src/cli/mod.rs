//! CLI for dlv: fetch one URL, check it, hand it over only if it checks out.

mod emit;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use dlv_core::checksum::{DigestAlgorithm, ExpectedDigests};
use dlv_core::config::{self, DlvConfig};
use dlv_core::control::CancelToken;
use dlv_core::fetch;
use dlv_core::gpg::{KeyDownloader, KeyId, KeyLength, KeyServerInformation};
use dlv_core::http::HttpClient;
use dlv_core::report::{KeySummary, Outcome, Report};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use url::Url;

/// Verification failed or nothing was verified.
pub const EXIT_UNVERIFIED: u8 = 1;
/// Bad arguments or configuration.
pub const EXIT_INVALID_INPUT: u8 = 3;
/// Network or filesystem failure.
pub const EXIT_IO: u8 = 4;

/// Download a file and verify it before handing it over.
#[derive(Debug, Parser)]
#[command(name = "dlv")]
#[command(about = "dlv: download a file and verify it before handing it over", long_about = None)]
pub struct Cli {
    /// Direct HTTP/HTTPS URL to download.
    #[arg(short = 'u', long)]
    pub url: String,

    /// Debug-level logging (RUST_LOG still takes precedence).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Copy the verified file into DIR instead of writing it to stdout.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub digests: DigestArgs,

    #[command(flatten)]
    pub keys: KeyArgs,

    /// Write a JSON report of the run to PATH.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Abort the whole run after SECS seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Expected digests, hex encoded.
#[derive(Debug, Default, Args)]
pub struct DigestArgs {
    #[arg(long, value_name = "HEX")]
    pub sha512: Option<String>,
    #[arg(long, value_name = "HEX")]
    pub sha384: Option<String>,
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
    #[arg(long, value_name = "HEX")]
    pub sha224: Option<String>,
    #[arg(long, value_name = "HEX")]
    pub sha1: Option<String>,
    #[arg(long, value_name = "HEX")]
    pub md5: Option<String>,
}

impl DigestArgs {
    pub fn expected(&self) -> ExpectedDigests {
        let given = [
            (DigestAlgorithm::Sha512, &self.sha512),
            (DigestAlgorithm::Sha384, &self.sha384),
            (DigestAlgorithm::Sha256, &self.sha256),
            (DigestAlgorithm::Sha224, &self.sha224),
            (DigestAlgorithm::Sha1, &self.sha1),
            (DigestAlgorithm::Md5, &self.md5),
        ];
        let mut expected = ExpectedDigests::new();
        for (algorithm, value) in given {
            if let Some(value) = value {
                expected.set(algorithm, value);
            }
        }
        expected
    }
}

/// Signing key lookup.
#[derive(Debug, Default, Args)]
pub struct KeyArgs {
    /// Fingerprint of the signing key to resolve on the key servers.
    #[arg(long, value_name = "KEY")]
    pub gpg_key: Option<String>,

    /// Key server host to query (repeatable).
    #[arg(long = "keyserver", value_name = "HOST")]
    pub keyservers: Vec<String>,

    /// Only query the servers given with --keyserver.
    #[arg(long)]
    pub no_default_keyservers: bool,

    /// Also query key servers over HKP (port 11371).
    #[arg(long)]
    pub hkp: bool,

    /// Also query key servers over plain HTTP.
    #[arg(long)]
    pub http: bool,

    /// Do not query key servers over HTTPS.
    #[arg(long)]
    pub no_https: bool,

    /// Accept 64-bit and 32-bit key ids (spoofable).
    #[arg(long)]
    pub allow_short_key_ids: bool,
}

/// Marks an error as caused by arguments or configuration.
#[derive(Debug)]
pub struct InvalidInput(pub String);

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<InvalidInput>().is_some() {
        EXIT_INVALID_INPUT
    } else {
        EXIT_IO
    }
}

/// Everything a run needs, validated before any I/O.
#[derive(Debug)]
pub struct Request {
    pub url: Url,
    pub digests: ExpectedDigests,
    pub key: Option<KeyId>,
    pub keyservers: KeyServerInformation,
    pub key_lookup_timeout: Duration,
    pub output_dir: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

impl Request {
    pub fn from_cli(cli: &Cli, cfg: &DlvConfig) -> Result<Self> {
        let url = Url::parse(&cli.url)
            .with_context(|| InvalidInput(format!("invalid URL {}", cli.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow::Error::msg(InvalidInput(format!(
                "unsupported URL scheme {}, expected http or https",
                url.scheme()
            ))));
        }

        let digests = cli.digests.expected();
        digests
            .validate()
            .context(InvalidInput("invalid checksum".to_string()))?;

        let min_length = if cli.keys.allow_short_key_ids {
            KeyLength::Short
        } else {
            KeyLength::FingerprintV3
        };
        let key = cli
            .keys
            .gpg_key
            .as_deref()
            .map(|raw| KeyId::with_min_length(raw, min_length))
            .transpose()
            .context(InvalidInput("invalid --gpg-key".to_string()))?;

        let keyservers = keyservers_from(&cli.keys, cfg);
        if key.is_some() {
            keyservers
                .validate()
                .context(InvalidInput("invalid key server".to_string()))?;
            if keyservers.servers.is_empty() || keyservers.protocol_count() == 0 {
                return Err(anyhow::Error::msg(InvalidInput(
                    "no key servers or key server protocols enabled".to_string(),
                )));
            }
        }

        Ok(Self {
            url,
            digests,
            key,
            keyservers,
            key_lookup_timeout: cfg.http.key_lookup_timeout(),
            output_dir: cli.output_dir.clone(),
            report_path: cli.report.clone(),
        })
    }
}

/// Config servers, replaced by --keyserver hosts (plus the built-ins unless
/// --no-default-keyservers), with protocol flags applied on top.
fn keyservers_from(args: &KeyArgs, cfg: &DlvConfig) -> KeyServerInformation {
    let mut info = cfg.keyservers.clone();
    if !args.keyservers.is_empty() {
        info.servers = args.keyservers.clone();
        if !args.no_default_keyservers {
            info.add_default_key_servers();
        }
    }
    if args.hkp {
        info.use_hkp = true;
    }
    if args.http {
        info.use_http = true;
    }
    if args.no_https {
        info.use_https = false;
    }
    info
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = config::load_or_init().context(InvalidInput("failed to load config".to_string()))?;
    tracing::debug!("loaded config: {:?}", cfg);
    let request = Request::from_cli(&cli, &cfg)?;

    let cancel = match cli.timeout {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let client = HttpClient::new(cfg.http.to_options());
    let outcome = tokio::task::spawn_blocking(move || verify(&request, &client, &cancel))
        .await
        .context("verification task panicked")??;
    Ok(match outcome {
        Outcome::Verified => ExitCode::SUCCESS,
        Outcome::ChecksumMismatch | Outcome::Unverified => ExitCode::from(EXIT_UNVERIFIED),
    })
}

/// Download into a scratch directory, check, and emit only when verified.
///
/// A checksum mismatch is final: the key servers are not contacted.
pub(crate) fn verify(
    request: &Request,
    client: &HttpClient,
    cancel: &CancelToken,
) -> Result<Outcome> {
    let scratch = tempfile::tempdir().context("create temporary directory")?;
    let path = fetch::download_to_dir(client, &request.url, scratch.path(), cancel)?;

    let checksums = request.digests.verify_path(&path)?;
    let signing_key = match &request.key {
        Some(key) if !checksums.is_invalid() => Some(resolve_key(request, key, client, cancel)?),
        _ => None,
    };
    let report = Report::new(&request.url, checksums, signing_key);

    if let Some(report_path) = &request.report_path {
        fs::write(report_path, report.to_json()?)
            .with_context(|| format!("write report {}", report_path.display()))?;
    }

    match report.outcome {
        Outcome::ChecksumMismatch => {
            tracing::error!(url = %request.url, "{}", report.message);
            eprintln!("dlv: {}", report.message);
            return Ok(report.outcome);
        }
        Outcome::Unverified => {
            tracing::warn!(url = %request.url, "{}", report.message);
            eprintln!("dlv warning: {}", report.message);
            return Ok(report.outcome);
        }
        Outcome::Verified => {}
    }

    match &request.output_dir {
        Some(dir) => {
            let dest = emit::copy_into_dir(&path, dir)?;
            eprintln!("dlv: {}, saved to {}", report.message, dest.display());
        }
        None => {
            emit::write_to(&path, &mut std::io::stdout().lock())?;
            eprintln!("dlv: {}", report.message);
        }
    }
    Ok(report.outcome)
}

fn resolve_key(
    request: &Request,
    key: &KeyId,
    client: &HttpClient,
    cancel: &CancelToken,
) -> Result<KeySummary> {
    let downloader = KeyDownloader::new(
        client.clone(),
        cancel.child_with_timeout(request.key_lookup_timeout),
    );
    let downloaded = downloader
        .download_key(&request.keyservers, key)
        .with_context(|| format!("resolve signing key {}", key))?;
    tracing::info!(key = %key, server = %downloaded.server, "signing key resolved");
    Ok(KeySummary::new(key.clone(), &downloaded))
}

#[cfg(test)]
mod tests;
