//! Trace download subsystem
//!
//! Makes sure a trace named by its path relative to the traces db is present
//! locally, fetching it when a download URL is configured. Transfers go
//! through a [`Transport`] that handles `http(s)://` (with retries) and
//! `file://` identically; MinIO-hosted traces are fetched with signed
//! requests using temporary credentials obtained once per [`Downloader`].

pub mod auth;
pub mod downloader;
pub mod error;
pub mod transport;

pub use auth::{CredentialCache, CredentialExchange, Credentials, MinioConfig, StsExchange};
pub use downloader::{DownloadOptions, Downloader};
pub use error::{DownloadError, Result};
pub use transport::{
    HttpTransport, LocalFileTransport, RetryPolicy, SchemeTransport, TransferResponse, Transport,
};
