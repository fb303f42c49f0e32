// playlist rewriting, one level at a time
//
// every reference in a manifest becomes a proxy url carrying its own locator, so a child
// playlist comes back through the same endpoint and gets rewritten on its own fetch. nothing
// here needs to know how deep the tree goes.
use crate::server::utils::locator_utils::{ContentKind, OpaqueLocator};

/// file extensions that mark a media chunk rather than another playlist
const SEGMENT_EXTENSIONS: [&str; 6] = ["ts", "m4s", "aac", "mp4", "m4a", "vtt"];

/// one output line of a rewritten manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewrittenLine<'a> {
    /// blank, directive or comment line, emitted byte for byte
    Verbatim(&'a str),
    /// a reference line, now pointing back at the proxy. `crlf` keeps the line ending the
    /// directives around it still have
    Reference { locator: OpaqueLocator, crlf: bool },
}

impl RewrittenLine<'_> {
    pub fn render(&self, proxy_base: &str) -> String {
        match self {
            Self::Verbatim(line) => line.to_string(),
            Self::Reference { locator, crlf } => format!(
                "{}?{}{}",
                proxy_base,
                locator.to_query(),
                if *crlf { "\r" } else { "" }
            ),
        }
    }
}

pub struct ManifestRewriter {
    proxy_base: String,
}

impl ManifestRewriter {
    pub fn new(proxy_base: impl Into<String>) -> Self {
        Self {
            proxy_base: proxy_base.into(),
        }
    }

    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// rewrite a whole manifest, line count and order are kept exactly
    pub fn rewrite(&self, manifest: &str, manifest_url: &str) -> String {
        manifest
            .split('\n')
            .map(|line| Self::rewrite_line(line, manifest_url).render(&self.proxy_base))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn rewrite_line<'a>(line: &'a str, manifest_url: &str) -> RewrittenLine<'a> {
        let trimmed = line.trim();

        // directives (#EXT-X-STREAM-INF, #EXT-X-KEY, ...) stay untouched, only the plain
        // reference lines after them change
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return RewrittenLine::Verbatim(line);
        }

        let resolved = Self::resolve_reference(trimmed, manifest_url);
        let kind = Self::classify(&resolved);

        RewrittenLine::Reference {
            locator: OpaqueLocator::new(resolved, kind),
            crlf: line.ends_with('\r'),
        }
    }

    /// make a reference absolute against the manifest it came from
    ///
    /// relative names replace the manifest's last path segment, `/path` keeps the manifest's
    /// origin and `//host/path` keeps its scheme. `../` is left for the cdn to deal with.
    pub fn resolve_reference(reference: &str, manifest_url: &str) -> String {
        if Self::has_http_scheme(reference) {
            return reference.to_string();
        }

        let base = manifest_url
            .split(['?', '#'])
            .next()
            .unwrap_or(manifest_url);
        let (origin, path) = Self::split_origin(base);

        if reference.starts_with("//") {
            let scheme = origin.split("://").next().unwrap_or("https");
            return format!("{}:{}", scheme, reference);
        }

        if reference.starts_with('/') {
            return format!("{}{}", origin, reference);
        }

        let directory = match path.rfind('/') {
            Some(i) => &path[..=i],
            None => "/",
        };

        format!("{}{}{}", origin, directory, reference)
    }

    /// `segment` when the last path segment carries a media extension
    ///
    /// host, directories and query never count, `stream.tsn.ca/live/v.m3u8` and
    /// `/hls/movie.mp4/index.m3u8` are both playlists.
    pub fn classify(url: &str) -> ContentKind {
        let path = match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                let (_, path) = Self::split_origin(without_query);
                path.to_string()
            }
        };

        let file_name = path.rsplit('/').next().unwrap_or("");
        let is_segment = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .is_some_and(|ext| SEGMENT_EXTENSIONS.contains(&ext.as_str()));

        if is_segment {
            ContentKind::Segment
        } else {
            ContentKind::Manifest
        }
    }

    fn has_http_scheme(reference: &str) -> bool {
        let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    // "https://cdn.example:8443/a/b.m3u8" -> ("https://cdn.example:8443", "/a/b.m3u8")
    fn split_origin(url: &str) -> (&str, &str) {
        let authority_start = url.find("://").map(|i| i + 3).unwrap_or(0);

        match url[authority_start..].find('/') {
            Some(i) => url.split_at(authority_start + i),
            None => (url, ""),
        }
    }
}
