//! Integration test: key-server walk against local canned servers.
//!
//! Each server answers every request the same way, so the order of
//! candidates and the hit counters show exactly how far the walk went.

mod common;

use common::canned_server::{self, CannedResponse};
use dlv_core::control::CancelToken;
use dlv_core::gpg::{KeyDownloadError, KeyDownloader, KeyId, KeyServerInformation, RetryReason};
use dlv_core::http::{HttpClient, HttpOptions, TransportError};
use std::time::Duration;

const ALPHA: &str = include_str!("fixtures/alpha.asc");
const BOTH: &str = include_str!("fixtures/alpha_and_beta.asc");
const ALPHA_FPR: &str = "9761F81B887051F4E85D9A1DA151848BADB89F74";

fn downloader() -> KeyDownloader {
    let options = HttpOptions {
        connect_timeout: Duration::from_secs(5),
        timeout: Duration::from_secs(10),
        ..HttpOptions::default()
    };
    KeyDownloader::new(HttpClient::new(options), CancelToken::new())
}

fn alpha_id() -> KeyId {
    KeyId::new(ALPHA_FPR).unwrap()
}

#[test]
fn not_found_then_key_on_second_server() {
    let missing = canned_server::start(CannedResponse::status(404));
    let good = canned_server::start(CannedResponse::keys(ALPHA));

    let key = downloader()
        .download_key_from(&[missing.base_url(), good.base_url()], &alpha_id())
        .unwrap();

    assert_eq!(key.server, good.base_url());
    assert_eq!(missing.hits(), 1);
    assert_eq!(good.hits(), 1);
}

#[test]
fn success_stops_the_walk() {
    let html = canned_server::start(CannedResponse::with_content_type(
        200,
        "text/html",
        b"<html>search results</html>",
    ));
    let good = canned_server::start(CannedResponse::keys(ALPHA));
    let never = canned_server::start(CannedResponse::keys(ALPHA));

    let key = downloader()
        .download_key_from(
            &[html.base_url(), good.base_url(), never.base_url()],
            &alpha_id(),
        )
        .unwrap();

    assert_eq!(key.server, good.base_url());
    assert_eq!(html.hits(), 1);
    assert_eq!(never.hits(), 0);
}

#[test]
fn several_keys_for_one_id_is_fatal() {
    let ambiguous = canned_server::start(CannedResponse::keys(BOTH));
    let good = canned_server::start(CannedResponse::keys(ALPHA));

    let err = downloader()
        .download_key_from(&[ambiguous.base_url(), good.base_url()], &alpha_id())
        .unwrap_err();

    match err {
        KeyDownloadError::MultipleKeysReturned { count, .. } => assert_eq!(count, 2),
        other => panic!("expected MultipleKeysReturned, got {other:?}"),
    }
    assert_eq!(good.hits(), 0);
}

#[test]
fn connection_failure_is_fatal() {
    let refused = canned_server::closed_port_url();
    let good = canned_server::start(CannedResponse::keys(ALPHA));

    let err = downloader()
        .download_key_from(&[refused, good.base_url()], &alpha_id())
        .unwrap_err();

    assert!(matches!(
        err,
        KeyDownloadError::Transport {
            source: TransportError::Curl(_),
            ..
        }
    ));
    assert_eq!(good.hits(), 0);
}

#[test]
fn cancelled_token_stops_before_any_request() {
    let good = canned_server::start(CannedResponse::keys(ALPHA));
    let cancel = CancelToken::new();
    cancel.cancel();
    let downloader = KeyDownloader::new(HttpClient::default(), cancel);

    let err = downloader
        .download_key_from(&[good.base_url()], &alpha_id())
        .unwrap_err();

    assert!(matches!(
        err,
        KeyDownloadError::Transport {
            source: TransportError::Cancelled,
            ..
        }
    ));
    assert_eq!(good.hits(), 0);
}

#[test]
fn every_server_retryable_reports_last_reason() {
    let missing = canned_server::start(CannedResponse::status(404));
    let empty = canned_server::start(CannedResponse::with_content_type(
        200,
        "application/pgp-keys",
        b"",
    ));

    let err = downloader()
        .download_key_from(&[missing.base_url(), empty.base_url()], &alpha_id())
        .unwrap_err();

    match err {
        KeyDownloadError::AllServersFailed { attempts, last } => {
            assert_eq!(attempts, 2);
            assert_eq!(last, RetryReason::EmptyKeyring);
        }
        other => panic!("expected AllServersFailed, got {other:?}"),
    }
}

#[test]
fn short_key_id_is_accepted_for_lookup() {
    let good = canned_server::start(CannedResponse::keys(ALPHA));
    let key = KeyId::with_min_length("ADB89F74", dlv_core::gpg::KeyLength::Short).unwrap();

    downloader()
        .download_key_from(&[good.base_url()], &key)
        .unwrap();

    assert_eq!(
        good.last_target().as_deref(),
        Some("/pks/lookup?op=get&search=0xADB89F74&exact=on&options=mr")
    );
}

#[test]
fn download_key_builds_lookup_request_from_server_info() {
    let good = canned_server::start(CannedResponse::keys(ALPHA));
    let mut info = KeyServerInformation::with_servers([good.host()]);
    info.use_http = true;

    let key = downloader().download_key(&info, &alpha_id()).unwrap();

    assert_eq!(key.server.port(), good.base_url().port());
    let expected = format!("/pks/lookup?op=get&search=0x{ALPHA_FPR}&exact=on&options=mr");
    assert_eq!(good.last_target(), Some(expected));
}
