//! Transfer transports
//!
//! `http(s)://` and `file://` URLs are served through the same [`Transport`]
//! interface so the download logic never needs to know where bytes come
//! from. Local file problems are reported with HTTP-style status codes.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect;
use tracing::{debug, warn};

use crate::error::{DownloadError, Result};

/// A response whose body has not been read yet.
pub struct TransferResponse {
    pub status: u16,
    pub reason: String,
    /// Size announced by the server, if any
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl TransferResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

impl std::fmt::Debug for TransferResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Something that can GET a URL.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransferResponse>;
}

/// Bounded retry budget, one counter per failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after failing to connect
    pub connect: u32,
    /// Retries after a timeout or a failure reading the response
    pub read: u32,
    /// Redirect hops followed before giving up
    pub redirect: u32,
    /// Delay before the first retry, doubled for each further one
    pub backoff: Duration,
}

impl RetryPolicy {
    /// The same budget for every failure kind.
    pub fn with_attempts(attempts: u32) -> Self {
        Self { connect: attempts, read: attempts, redirect: attempts, ..Self::default() }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { connect: 2, read: 2, redirect: 2, backoff: Duration::from_millis(250) }
    }
}

/// Blocking HTTP(S) transport with retries.
pub struct HttpTransport {
    client: Client,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let max_hops = policy.redirect as usize;
        // Stopping hands back the last 3xx response, which the caller rejects.
        let redirects = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_hops { attempt.stop() } else { attempt.follow() }
        });

        let client = Client::builder()
            .user_agent(concat!("replayer/", env!("CARGO_PKG_VERSION")))
            .redirect(redirects)
            .build()
            .map_err(DownloadError::Client)?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransferResponse> {
        let mut connect_retries = 0;
        let mut read_retries = 0;
        let mut delay = self.policy.backoff;

        loop {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    debug!("GET {} -> {}", url, status);
                    return Ok(TransferResponse {
                        status: status.as_u16(),
                        reason: status.canonical_reason().unwrap_or_default().to_string(),
                        content_length: response.content_length(),
                        body: Box::new(response),
                    });
                }
                Err(e) => {
                    let retry = if e.is_connect() {
                        connect_retries += 1;
                        connect_retries <= self.policy.connect
                    } else if e.is_timeout() || e.is_request() || e.is_body() {
                        read_retries += 1;
                        read_retries <= self.policy.read
                    } else {
                        false
                    };

                    if !retry {
                        return Err(DownloadError::Request {
                            url: url.to_string(),
                            attempts: connect_retries + read_retries,
                            source: e,
                        });
                    }
                    warn!(
                        "GET {} failed ({}), retrying (connect {}/{}, read {}/{})",
                        url,
                        e,
                        connect_retries,
                        self.policy.connect,
                        read_retries,
                        self.policy.read
                    );
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
}

/// Serves `file://` URLs from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileTransport;

impl LocalFileTransport {
    fn response(status: u16, reason: &str) -> TransferResponse {
        TransferResponse {
            status,
            reason: reason.to_string(),
            content_length: None,
            body: Box::new(io::empty()),
        }
    }

    fn path_of(url: &str) -> Result<PathBuf> {
        let parsed = url::Url::parse(url)
            .map_err(|e| DownloadError::InvalidUrl { url: url.to_string(), reason: e.to_string() })?;
        parsed.to_file_path().map_err(|()| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })
    }
}

impl Transport for LocalFileTransport {
    fn get(&self, url: &str, _headers: &[(String, String)]) -> Result<TransferResponse> {
        let path = Self::path_of(url)?;

        if path.is_dir() {
            return Ok(Self::response(400, "Path Not A File"));
        }
        if !path.is_file() {
            return Ok(Self::response(404, "File Not Found"));
        }

        match File::open(&path) {
            Ok(file) => {
                let content_length = file.metadata().ok().map(|m| m.len());
                Ok(TransferResponse {
                    status: 200,
                    reason: "OK".to_string(),
                    content_length,
                    body: Box::new(file),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Ok(Self::response(403, "Access Denied"))
            }
            Err(e) => Ok(Self::response(500, &e.to_string())),
        }
    }
}

/// Routes a URL to the HTTP or file transport by its scheme.
pub struct SchemeTransport {
    http: HttpTransport,
    file: LocalFileTransport,
}

impl SchemeTransport {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        Ok(Self { http: HttpTransport::new(policy)?, file: LocalFileTransport })
    }
}

impl Transport for SchemeTransport {
    fn get(&self, url: &str, headers: &[(String, String)]) -> Result<TransferResponse> {
        let scheme = url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
        match scheme.as_deref() {
            Some("http") | Some("https") => self.http.get(url, headers),
            Some("file") => self.file.get(url, headers),
            _ => Err(DownloadError::UnsupportedScheme(url.to_string())),
        }
    }
}
