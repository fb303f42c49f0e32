use std::fmt;

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use thiserror::Error;

/// what the client told us it is fetching, decides rewrite vs passthrough
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Manifest,
    Segment,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Segment => "segment",
        }
    }

    /// `master` and `variant` are what older playlists still carry, a missing type means a
    /// top level manifest and anything unknown falls through to raw passthrough
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(|p| p.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("manifest") | Some("master") | Some("variant") => {
                Self::Manifest
            }
            Some(_) => Self::Segment,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LocatorError {
    #[error("URL parameter required")]
    Missing,
    #[error("Invalid URL encoding")]
    Encoding,
    #[error("Invalid URL format")]
    UnsupportedUrl,
}

/// an upstream url and its kind, reversible but NOT secret
///
/// on the wire this is `url=<base64url without padding>&type=<kind>`, everywhere else it
/// stays typed so the encode and decode sides can't drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueLocator {
    url: String,
    kind: ContentKind,
}

impl OpaqueLocator {
    pub fn new(url: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn encoded_url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.url.as_bytes())
    }

    /// query string for the proxy endpoint, already url safe
    pub fn to_query(&self) -> String {
        format!("url={}&type={}", self.encoded_url(), self.kind)
    }

    /// decodes what a client sent us back, only absolute http(s) urls make it through
    pub fn decode(encoded: Option<&str>, kind: ContentKind) -> Result<Self, LocatorError> {
        let encoded = encoded.map(str::trim).unwrap_or("");
        if encoded.is_empty() {
            return Err(LocatorError::Missing);
        }

        // padding is optional and a bare '+' from the standard alphabet arrives as a space
        // after query decoding
        let normalized = encoded.trim_end_matches('=').replace(' ', "+");

        let bytes = URL_SAFE_NO_PAD
            .decode(&normalized)
            .or_else(|_| STANDARD_NO_PAD.decode(&normalized))
            .map_err(|_| LocatorError::Encoding)?;

        let url = String::from_utf8(bytes).map_err(|_| LocatorError::Encoding)?;

        let parsed = url::Url::parse(&url).map_err(|_| LocatorError::UnsupportedUrl)?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(LocatorError::UnsupportedUrl);
        }

        Ok(Self { url, kind })
    }
}
