//! MinIO authentication
//!
//! A caller-supplied JWT is exchanged for temporary credentials with an STS
//! `AssumeRoleWithWebIdentity` call, and each GET is then signed with the
//! AWS v2 scheme (HMAC-SHA1 over a canonical string).

use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::blocking::Client;
use sha1::Sha1;
use tracing::{debug, error, info};

use crate::error::{DownloadError, Result};

type HmacSha1 = Hmac<Sha1>;

const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/FederatedWebIdentityRole";
const STS_VERSION: &str = "2011-06-15";
const SESSION_SECONDS: u32 = 3600;

/// Characters escaped when quoting the signed resource; `%` is kept so
/// already-quoted paths are not double encoded.
const RESOURCE_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Object-store settings; every field is required once a host is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinioConfig {
    pub host: String,
    pub bucket: String,
    pub role_session_name: String,
    pub jwt: String,
}

/// Temporary credentials returned by the STS exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Exchanges a web identity token for temporary credentials.
pub trait CredentialExchange: Send + Sync {
    fn assume_role(&self, minio: &MinioConfig) -> Result<Credentials>;
}

/// STS exchange over HTTPS against the MinIO host.
pub struct StsExchange {
    client: Client,
}

impl StsExchange {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("replayer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DownloadError::Client)?;
        Ok(Self { client })
    }
}

impl CredentialExchange for StsExchange {
    fn assume_role(&self, minio: &MinioConfig) -> Result<Credentials> {
        let url = format!("https://{}", minio.host);
        let duration = SESSION_SECONDS.to_string();
        let params = [
            ("Action", "AssumeRoleWithWebIdentity"),
            ("Version", STS_VERSION),
            ("RoleArn", ROLE_ARN),
            ("RoleSessionName", minio.role_session_name.as_str()),
            ("DurationSeconds", duration.as_str()),
            ("WebIdentityToken", minio.jwt.as_str()),
        ];

        info!("Requesting temporary MinIO credentials from {}", minio.host);
        let response = self
            .client
            .post(&url)
            .query(&params)
            .send()
            .map_err(|source| DownloadError::Request { url: url.clone(), attempts: 1, source })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|source| DownloadError::Request { url: url.clone(), attempts: 1, source })?;
        if status.as_u16() >= 400 {
            error!("{}", body);
            return Err(DownloadError::Status {
                url,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        parse_sts_response(&body)
    }
}

/// Extract the credential triple from an STS XML response.
///
/// Elements are matched by local name, so the response namespace does not
/// matter; entities in the values are decoded.
pub fn parse_sts_response(xml: &str) -> Result<Credentials> {
    let document = roxmltree::Document::parse(xml)
        .map_err(|e| DownloadError::Credentials(format!("malformed STS response: {e}")))?;
    let credentials = document.descendants().find(|node| node.has_tag_name("Credentials"));

    let field = |name: &str| -> Result<String> {
        credentials
            .and_then(|node| node.children().find(|child| child.has_tag_name(name)))
            .and_then(|node| node.text())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| DownloadError::Credentials(format!("{name} missing from STS response")))
    };

    Ok(Credentials {
        access_key_id: field("AccessKeyId")?,
        secret_access_key: field("SecretAccessKey")?,
        session_token: field("SessionToken")?,
    })
}

/// Credentials exchanged at most once per cache.
///
/// The lock is held across the exchange so concurrent callers share a
/// single request.
#[derive(Debug, Default)]
pub struct CredentialCache {
    slot: Mutex<Option<Credentials>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that already holds credentials and never exchanges.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self { slot: Mutex::new(Some(credentials)) }
    }

    pub fn get_or_exchange(
        &self,
        exchange: &dyn CredentialExchange,
        minio: &MinioConfig,
    ) -> Result<Credentials> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(credentials) = slot.as_ref() {
            return Ok(credentials.clone());
        }

        let credentials = exchange.assume_role(minio)?;
        debug!("Cached MinIO credentials for key {}", credentials.access_key_id);
        *slot = Some(credentials.clone());
        Ok(credentials)
    }
}

/// Base64 HMAC-SHA1 of `message` keyed with `key`.
pub fn sign_with_hmac(key: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| DownloadError::Credentials(format!("unusable signing key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// RFC 1123 date as used by the `Date` header.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Quote a resource path for the canonical string.
pub fn requote_resource(resource: &str) -> String {
    utf8_percent_encode(resource, RESOURCE_ESCAPES).to_string()
}

pub fn string_to_sign(date: &str, session_token: &str, bucket: &str, resource: &str) -> String {
    format!(
        "GET\n\n\n{date}\nx-amz-security-token:{session_token}\n/{bucket}/{}",
        requote_resource(resource)
    )
}

/// Headers authorizing a GET of `resource` from the configured bucket.
pub fn authorization_headers(
    minio: &MinioConfig,
    credentials: &Credentials,
    resource: &str,
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>> {
    let date = http_date(now);
    let to_sign = string_to_sign(&date, &credentials.session_token, &minio.bucket, resource);
    let signature = sign_with_hmac(&credentials.secret_access_key, &to_sign)?;

    Ok(vec![
        ("Host".to_string(), minio.host.clone()),
        ("Date".to_string(), date),
        (
            "Authorization".to_string(),
            format!("AWS {}:{}", credentials.access_key_id, signature),
        ),
        ("x-amz-security-token".to_string(), credentials.session_token.clone()),
    ])
}
