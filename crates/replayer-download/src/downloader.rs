//! `ensure_file`: make a trace available under the db path

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::{
    CredentialCache, CredentialExchange, MinioConfig, StsExchange, authorization_headers,
};
use crate::error::{DownloadError, Result};
use crate::transport::{RetryPolicy, SchemeTransport, Transport};

/// Transfers are streamed to disk in chunks of this size.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Where and how traces are fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Base URL the relative trace path is appended to
    pub url: Option<String>,
    /// Prefix prepended to `url`
    pub caching_proxy_url: Option<String>,
    /// Download even when the destination already exists
    pub force: bool,
    pub minio_host: Option<String>,
    pub minio_bucket: Option<String>,
    pub role_session_name: Option<String>,
    pub jwt: Option<String>,
    pub retry: RetryPolicy,
}

impl DownloadOptions {
    /// MinIO settings, if a host is configured.
    pub fn minio(&self) -> Result<Option<MinioConfig>> {
        let Some(host) = self.minio_host.as_ref().filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let required = |value: &Option<String>, name: &'static str| {
            value.clone().filter(|v| !v.is_empty()).ok_or(DownloadError::MissingOption(name))
        };

        Ok(Some(MinioConfig {
            host: host.clone(),
            bucket: required(&self.minio_bucket, "minio_bucket")?,
            role_session_name: required(&self.role_session_name, "role_session_name")?,
            jwt: required(&self.jwt, "jwt")?,
        }))
    }

    /// Base URL with the caching proxy prefix applied.
    pub fn effective_url(&self) -> Option<String> {
        let url = self.url.as_ref()?;
        Some(match &self.caching_proxy_url {
            Some(proxy) => format!("{proxy}{url}"),
            None => url.clone(),
        })
    }
}

/// Fetches traces into the local db, one transfer per missing file.
pub struct Downloader {
    db_path: PathBuf,
    options: DownloadOptions,
    transport: Box<dyn Transport>,
    exchange: Box<dyn CredentialExchange>,
    credentials: CredentialCache,
}

impl Downloader {
    /// Downloader using the real HTTP/file transport and STS exchange.
    pub fn new(db_path: impl Into<PathBuf>, options: DownloadOptions) -> Result<Self> {
        let transport = SchemeTransport::new(options.retry)?;
        let exchange = StsExchange::new()?;
        Self::with_parts(db_path, options, Box::new(transport), Box::new(exchange))
    }

    /// Downloader with injected transport and credential exchange.
    pub fn with_parts(
        db_path: impl Into<PathBuf>,
        options: DownloadOptions,
        transport: Box<dyn Transport>,
        exchange: Box<dyn CredentialExchange>,
    ) -> Result<Self> {
        validate_url(options.url.as_deref())?;
        validate_url(options.caching_proxy_url.as_deref())?;
        options.minio()?;

        Ok(Self {
            db_path: db_path.into(),
            options,
            transport,
            exchange,
            credentials: CredentialCache::new(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Replace the base download URL, e.g. with the one a manifest names.
    pub fn set_download_url(&mut self, url: Option<String>) -> Result<()> {
        validate_url(url.as_deref())?;
        self.options.url = url;
        Ok(())
    }

    /// Local path of a trace inside the db.
    pub fn local_path(&self, relative_path: &str) -> PathBuf {
        self.db_path.join(relative_path)
    }

    /// Make sure `relative_path` exists under the db path.
    ///
    /// Without a download URL the file must already be there. With one, the
    /// file is fetched unless it exists and downloads are not forced.
    pub fn ensure_file(&self, relative_path: &str) -> Result<PathBuf> {
        let destination = self.local_path(relative_path);

        let Some(url) = self.options.effective_url() else {
            if !destination.exists() {
                return Err(DownloadError::Missing(destination));
            }
            return Ok(destination);
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| DownloadError::io(parent, e))?;
        }

        if !self.options.force && destination.exists() {
            debug!("{} already present, skipping download", destination.display());
            return Ok(destination);
        }

        print!("[check_image] Downloading file {relative_path} ");
        let _ = io::stdout().flush();

        let headers = match self.options.minio()? {
            Some(minio) => {
                let credentials =
                    self.credentials.get_or_exchange(self.exchange.as_ref(), &minio)?;
                authorization_headers(&minio, &credentials, relative_path, Utc::now())?
            }
            None => Vec::new(),
        };

        let started = Instant::now();
        self.download(&format!("{url}{relative_path}"), &destination, &headers)?;
        println!("took {}s.", started.elapsed().as_secs());

        Ok(destination)
    }

    fn download(&self, url: &str, destination: &Path, headers: &[(String, String)]) -> Result<()> {
        info!("Downloading {} -> {}", url, destination.display());
        let response = self.transport.get(url, headers)?;

        if response.is_redirect() {
            return Err(DownloadError::TooManyRedirects {
                url: url.to_string(),
                hops: self.options.retry.redirect,
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status,
                reason: response.reason,
            });
        }

        let expected = response.content_length;
        if let Err(e) = stream_to_file(response.body, destination) {
            let _ = fs::remove_file(destination);
            return Err(e);
        }

        let Some(expected) = expected else {
            warn!("Error getting Content-Length from server. Skipping file size check.");
            return Ok(());
        };

        let actual = fs::metadata(destination).map_err(|e| DownloadError::io(destination, e))?.len();
        if actual != expected {
            let _ = fs::remove_file(destination);
            return Err(DownloadError::SizeMismatch {
                path: destination.to_path_buf(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

fn stream_to_file(mut body: Box<dyn Read + Send>, destination: &Path) -> Result<u64> {
    let mut file = File::create(destination).map_err(|e| DownloadError::io(destination, e))?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DownloadError::io(destination, e)),
        };
        file.write_all(&buffer[..n]).map_err(|e| DownloadError::io(destination, e))?;
        written += n as u64;
    }

    file.flush().map_err(|e| DownloadError::io(destination, e))?;
    debug!("Wrote {} bytes to {}", written, destination.display());
    Ok(written)
}

fn validate_url(url: Option<&str>) -> Result<()> {
    if let Some(url) = url {
        url::Url::parse(url)
            .map_err(|e| DownloadError::InvalidUrl { url: url.to_string(), reason: e.to_string() })?;
    }
    Ok(())
}
