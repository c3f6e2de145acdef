//! Minimal HTTP/1.1 server that answers every GET with one canned response.
//!
//! Stands in for a key server or an artifact host. Counts requests and
//! records request targets so tests can assert which servers were contacted.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use url::Url;

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CannedResponse {
    /// 200 with `application/pgp-keys`.
    pub fn keys(armored: &str) -> Self {
        Self::with_content_type(200, "application/pgp-keys", armored.as_bytes())
    }

    /// Bare status with an HTML body.
    pub fn status(status: u16) -> Self {
        Self::with_content_type(status, "text/html", b"<html>no</html>")
    }

    pub fn with_content_type(status: u16, content_type: &str, body: &[u8]) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
            body: body.to_vec(),
        }
    }
}

pub struct CannedServer {
    addr: String,
    hits: Arc<AtomicUsize>,
    targets: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    /// "127.0.0.1:PORT", usable as a key-server hostname.
    pub fn host(&self) -> &str {
        &self.addr
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    pub fn url(&self, path: &str) -> Url {
        self.base_url().join(path).unwrap()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_target(&self) -> Option<String> {
        self.targets.lock().unwrap().last().cloned()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(response: CannedResponse) -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap().to_string();
    let hits = Arc::new(AtomicUsize::new(0));
    let targets = Arc::new(Mutex::new(Vec::new()));
    let response = Arc::new(response);
    {
        let hits = Arc::clone(&hits);
        let targets = Arc::clone(&targets);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let response = Arc::clone(&response);
                let hits = Arc::clone(&hits);
                let targets = Arc::clone(&targets);
                thread::spawn(move || handle(stream, &response, &hits, &targets));
            }
        });
    }
    CannedServer {
        addr,
        hits,
        targets,
    }
}

/// An address with nothing listening on it.
pub fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/", addr)).unwrap()
}

fn handle(
    mut stream: TcpStream,
    response: &CannedResponse,
    hits: &AtomicUsize,
    targets: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    targets.lock().unwrap().push(target);
    hits.fetch_add(1, Ordering::SeqCst);

    let reason = match response.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let content_type = response
        .content_type
        .as_deref()
        .map(|ct| format!("Content-Type: {}\r\n", ct))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {} {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason,
        content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
}
