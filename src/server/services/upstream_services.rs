use std::time::Duration;

use anyhow::Context;
use axum::body::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{
    StatusCode,
    header::{self, HeaderMap, HeaderValue},
    redirect,
};
use thiserror::Error;
use tracing::debug;

use crate::{config::AppConfig, server::utils::encoding_utils::ContentEncoding};

const MAX_REDIRECTS: usize = 10;
/// a real playlist is a few KB, anything past this is not a playlist
pub const MAX_MANIFEST_BYTES: usize = 4 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("upstream returned {0}")]
    Status(u16),
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream body unusable: {0}")]
    InvalidBody(String),
}

impl FetchError {
    /// whatever status the cdn actually answered with, if it got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidBody(_) => None,
        }
    }
}

/// a successful (2xx) upstream answer whose body hasn't been read yet
pub struct UpstreamResponse {
    response: reqwest::Response,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// where we ended up after redirects
    pub fn final_url(&self) -> &str {
        self.response.url().as_str()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE)
    }

    /// full body as text, decompressed if the cdn compressed it without being asked
    ///
    /// capped at `MAX_MANIFEST_BYTES` on the wire and after decompression, a locator without
    /// a type defaults to manifest so this can be pointed at anything
    pub async fn text(self) -> Result<String, FetchError> {
        let encoding = ContentEncoding::from_content_encoding(self.header(header::CONTENT_ENCODING));

        if let Some(length) = self.response.content_length() {
            if length > MAX_MANIFEST_BYTES as u64 {
                return Err(Self::too_large(length as usize));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = self.response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > MAX_MANIFEST_BYTES {
                return Err(Self::too_large(bytes.len() + chunk.len()));
            }
            bytes.extend_from_slice(&chunk);
        }
        debug!("Read {} upstream bytes ({:?})", bytes.len(), encoding);

        let decompressed = encoding
            .decompress(&bytes)
            .map_err(|e| FetchError::InvalidBody(format!("failed to decompress: {}", e)))?;
        if decompressed.len() > MAX_MANIFEST_BYTES {
            return Err(Self::too_large(decompressed.len()));
        }

        String::from_utf8(decompressed)
            .map_err(|_| FetchError::InvalidBody("manifest is not valid UTF-8".to_string()))
    }

    fn too_large(size: usize) -> FetchError {
        FetchError::InvalidBody(format!(
            "manifest larger than {} bytes (got at least {})",
            MAX_MANIFEST_BYTES, size
        ))
    }

    /// body as it arrives, dropping the stream drops the upstream connection with it
    pub fn into_stream(
        self,
    ) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static {
        self.response.bytes_stream()
    }
}

/// the only thing that talks to the cdn
///
/// certificate verification is off on purpose: the cdn edges serve chains that don't
/// validate against the standard roots. that's an accepted risk for content that is public
/// once authorized, not something to quietly "fix".
pub struct UpstreamFetcher {
    http: reqwest::Client,
}

impl UpstreamFetcher {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::ORIGIN,
            HeaderValue::from_str(&config.upstream_origin).context("Invalid upstream origin")?,
        );
        default_headers.insert(
            header::REFERER,
            HeaderValue::from_str(&config.upstream_referer).context("Invalid upstream referer")?,
        );
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.upstream_accept_language)
                .context("Invalid upstream accept language")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(config.upstream_timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build upstream http client")?;

        Ok(Self { http })
    }

    /// one GET, no retries, anything outside 2xx is an error
    pub async fn fetch(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<UpstreamResponse, FetchError> {
        debug!("Fetching upstream: {}", url);

        let response = self.http.get(url).headers(headers).send().await?;
        let status = response.status();

        debug!("Upstream answered {} for {}", status, url);

        if !status.is_success() {
            // the body is usually a cloudflare page, not worth reading
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(UpstreamResponse { response })
    }
}
