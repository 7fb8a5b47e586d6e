//! Retry and redirect budgets of the HTTP transport against a local socket

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use replayer_download::{
    DownloadError, DownloadOptions, Downloader, HttpTransport, RetryPolicy, StsExchange, Transport,
};

fn no_backoff() -> RetryPolicy {
    RetryPolicy { backoff: Duration::ZERO, ..RetryPolicy::default() }
}

/// Answers every request with a 302 to a fresh path and counts requests.
fn redirecting_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    let location_base = base.clone();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let Ok(read_half) = stream.try_clone() else { continue };
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            while reader.read_line(&mut line).is_ok_and(|n| n > 0) {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }

            let hop = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = write!(
                stream,
                "HTTP/1.1 302 Found\r\nLocation: {location_base}hop{hop}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
        }
    });

    (base, hits)
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

#[test]
fn connect_failures_are_retried_up_to_the_budget() {
    let transport = HttpTransport::new(no_backoff()).unwrap();
    let url = format!("{}a.trace", closed_port_url());

    let err = transport.get(&url, &[]).unwrap_err();
    match err {
        DownloadError::Request { attempts, url: failed, .. } => {
            assert_eq!(attempts, no_backoff().connect + 1);
            assert_eq!(failed, url);
        }
        other => panic!("expected a request error, got {other:?}"),
    }
}

#[test]
fn zero_connect_budget_fails_on_first_attempt() {
    let policy = RetryPolicy { connect: 0, ..no_backoff() };
    let transport = HttpTransport::new(policy).unwrap();

    let err = transport.get(&format!("{}a.trace", closed_port_url()), &[]).unwrap_err();
    assert!(matches!(err, DownloadError::Request { attempts: 1, .. }));
}

#[test]
fn redirects_stop_after_the_hop_budget() {
    let (base, hits) = redirecting_server();
    let transport = HttpTransport::new(no_backoff()).unwrap();

    let response = transport.get(&format!("{base}loop.trace"), &[]).unwrap();
    assert!(response.is_redirect());
    assert_eq!(hits.load(Ordering::SeqCst), no_backoff().redirect as usize + 1);
}

#[test]
fn endless_redirects_fail_the_download() {
    let (base, _hits) = redirecting_server();
    let db = tempfile::tempdir().unwrap();
    let options = DownloadOptions { url: Some(base), retry: no_backoff(), ..DownloadOptions::default() };
    let downloader = Downloader::with_parts(
        db.path(),
        options,
        Box::new(HttpTransport::new(no_backoff()).unwrap()),
        Box::new(StsExchange::new().unwrap()),
    )
    .unwrap();

    let err = downloader.ensure_file("loop.trace").unwrap_err();
    assert!(matches!(err, DownloadError::TooManyRedirects { hops: 2, status: 302, .. }));
    assert!(!err.is_fatal());
    assert!(!db.path().join("loop.trace").exists());
}
