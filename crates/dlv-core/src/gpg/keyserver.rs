//! Key-server selection: which hosts to ask and over which protocols.
//!
//! Candidates are grouped by protocol (HTTPS, then HKP, then plain HTTP) so
//! that a secure transport is always tried on every server before falling
//! back. Within each group the servers are shuffled, using one permutation
//! shared by every group.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

/// Port of the HTTP Keyserver Protocol.
pub const HKP_PORT: u16 = 11371;

/// Hostnames used when the caller asks for the defaults.
pub const DEFAULT_KEY_SERVERS: &[&str] = &["keyserver.ubuntu.com", "pgp.mit.edu"];

#[derive(Debug, thiserror::Error)]
#[error("invalid key server `{host}'")]
pub struct InvalidKeyServer {
    pub host: String,
    #[source]
    pub source: url::ParseError,
}

/// Key servers and enabled transports. Forms the `[keyservers]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyServerInformation {
    /// Hostnames, optionally with a port (`host` or `host:port`).
    pub servers: Vec<String>,
    pub use_https: bool,
    pub use_hkp: bool,
    pub use_http: bool,
}

impl Default for KeyServerInformation {
    /// Built-in servers over HTTPS only.
    fn default() -> Self {
        Self {
            servers: DEFAULT_KEY_SERVERS.iter().map(|s| s.to_string()).collect(),
            use_https: true,
            use_hkp: false,
            use_http: false,
        }
    }
}

impl KeyServerInformation {
    /// Given servers with no protocols enabled.
    pub fn with_servers<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: servers.into_iter().map(Into::into).collect(),
            use_https: false,
            use_hkp: false,
            use_http: false,
        }
    }

    /// Append any built-in servers not already present, keeping first-seen
    /// order and dropping duplicates.
    pub fn add_default_key_servers(&mut self) -> &mut Self {
        let mut merged: Vec<String> =
            Vec::with_capacity(self.servers.len() + DEFAULT_KEY_SERVERS.len());
        let candidates = self
            .servers
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_KEY_SERVERS.iter().copied());
        for server in candidates {
            if !merged.iter().any(|s| s == server) {
                merged.push(server.to_string());
            }
        }
        self.servers = merged;
        self
    }

    /// Check every configured server forms a valid URL under each enabled
    /// protocol, so URL derivation yields one candidate per protocol and host.
    /// With no protocol enabled the HTTPS form is checked.
    pub fn validate(&self) -> Result<(), InvalidKeyServer> {
        let mut forms = self.url_forms();
        if forms.is_empty() {
            forms.push(("https", None));
        }
        for host in &self.servers {
            for &(scheme, port) in &forms {
                server_url(scheme, host, port).map_err(|source| InvalidKeyServer {
                    host: host.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Scheme and port of each enabled protocol, in query order.
    fn url_forms(&self) -> Vec<(&'static str, Option<u16>)> {
        [
            (self.use_https, "https", None),
            (self.use_hkp, "http", Some(HKP_PORT)),
            (self.use_http, "http", None),
        ]
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .map(|(_, scheme, port)| (scheme, port))
        .collect()
    }

    pub fn protocol_count(&self) -> usize {
        [self.use_https, self.use_hkp, self.use_http]
            .iter()
            .filter(|enabled| **enabled)
            .count()
    }

    /// Candidate base URLs in the order they should be tried.
    pub fn key_server_urls(&self) -> Vec<Url> {
        self.key_server_urls_with_rng(&mut rand::thread_rng())
    }

    /// Like [`key_server_urls`](Self::key_server_urls) with a caller-supplied
    /// source of randomness for the server permutation.
    pub fn key_server_urls_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Url> {
        if self.protocol_count() == 0 {
            return Vec::new();
        }
        let mut order: Vec<usize> = (0..self.servers.len()).collect();
        order.shuffle(rng);

        let mut urls = Vec::with_capacity(self.protocol_count() * self.servers.len());
        for (scheme, port) in self.url_forms() {
            for &index in &order {
                let host = &self.servers[index];
                match server_url(scheme, host, port) {
                    Ok(url) => urls.push(url),
                    Err(e) => {
                        tracing::warn!(host = %host, error = %e, "skipping invalid key server")
                    }
                }
            }
        }
        urls
    }
}

fn server_url(scheme: &str, host: &str, port: Option<u16>) -> Result<Url, url::ParseError> {
    let host = host.trim();
    if host.is_empty() || host.contains(['/', '?', '#', '@']) {
        return Err(url::ParseError::InvalidDomainCharacter);
    }
    let raw = match port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };
    Url::parse(&raw)
}
