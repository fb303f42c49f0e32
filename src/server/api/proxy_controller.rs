// the recursive proxy: manifests come back rewritten, anything else is piped straight through
use axum::{
    Extension, Router,
    body::Body,
    extract::Query,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, error};

use crate::server::{
    error::{AppResult, Error},
    extractors::ClientIdentity,
    services::{
        AppServices,
        upstream_services::{FetchError, UpstreamResponse},
    },
    utils::{
        encoding_utils::ContentEncoding,
        locator_utils::{ContentKind, OpaqueLocator},
    },
};

const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";
// segments never change once published, manifests can change on every fetch
const SEGMENT_CACHE_CONTROL: &str = "public, max-age=3600";
const MANIFEST_CACHE_CONTROL: &str = "no-cache";

#[derive(Deserialize)]
struct ProxyQuery {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub struct ProxyController;

impl ProxyController {
    pub fn app() -> Router {
        Router::new().route("/proxy", get(Self::proxy_get).options(Self::proxy_options))
    }

    async fn proxy_get(
        Extension(services): Extension<AppServices>,
        identity: ClientIdentity,
        Query(params): Query<ProxyQuery>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        let kind = ContentKind::from_param(params.kind.as_deref());

        let locator = OpaqueLocator::decode(params.url.as_deref(), kind).map_err(|e| {
            debug!("Rejected locator from {}: {}", identity, e);
            Error::ClientInput(e.to_string())
        })?;

        counter!("proxy_requests_total", "kind" => kind.as_str()).increment(1);
        debug!("Proxying {} for {}: {}", kind, identity, locator.url());

        let upstream_headers = Self::upstream_headers(&identity, kind, &headers);

        let response = services
            .upstream
            .fetch(locator.url(), upstream_headers)
            .await
            .map_err(|e| Self::fetch_failed(&locator, &identity, e))?;

        match kind {
            ContentKind::Segment => Ok(Self::segment_response(response)),
            ContentKind::Manifest => {
                // relative references resolve against where the manifest really lives
                let manifest_url = response.final_url().to_string();
                let text = response
                    .text()
                    .await
                    .map_err(|e| Self::fetch_failed(&locator, &identity, e))?;

                let rewritten = services.rewriter.rewrite(&text, &manifest_url);
                debug!(
                    "Rewrote manifest {} ({} -> {} bytes)",
                    locator.url(),
                    text.len(),
                    rewritten.len()
                );

                Self::manifest_response(&rewritten, &headers)
            }
        }
    }

    async fn proxy_options() -> impl IntoResponse {
        let mut response_headers = HeaderMap::new();
        Self::insert_cors_headers(&mut response_headers);

        (StatusCode::NO_CONTENT, response_headers)
    }

    // the cdn sees the player's own agent, and a Range for seeking inside segments
    fn upstream_headers(
        identity: &ClientIdentity,
        kind: ContentKind,
        headers: &HeaderMap,
    ) -> HeaderMap {
        let mut upstream_headers = HeaderMap::new();

        if let Ok(user_agent) = HeaderValue::from_str(identity.user_agent()) {
            upstream_headers.insert(header::USER_AGENT, user_agent);
        }

        if kind == ContentKind::Segment {
            if let Some(range) = headers.get(header::RANGE) {
                upstream_headers.insert(header::RANGE, range.clone());
            }
        }

        upstream_headers
    }

    fn fetch_failed(locator: &OpaqueLocator, identity: &ClientIdentity, e: FetchError) -> Error {
        counter!("proxy_upstream_errors_total", "kind" => locator.kind().as_str()).increment(1);
        error!(
            "Upstream fetch failed (kind={}, client={}, url={}): {}",
            locator.kind(),
            identity,
            locator.url(),
            e
        );

        Error::UpstreamFetch { status: e.status() }
    }

    fn insert_cors_headers(response_headers: &mut HeaderMap) {
        response_headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response_headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        response_headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        );
    }

    /// bytes go out as they come in, nothing is buffered
    fn segment_response(response: UpstreamResponse) -> Response {
        let mut response_headers = HeaderMap::new();
        Self::insert_cors_headers(&mut response_headers);

        let content_type = response
            .content_type()
            .and_then(|v| HeaderValue::from_str(v).ok())
            .unwrap_or_else(|| HeaderValue::from_static(SEGMENT_CONTENT_TYPE));
        response_headers.insert(header::CONTENT_TYPE, content_type);
        response_headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(SEGMENT_CACHE_CONTROL),
        );

        // these only make sense alongside the untouched body
        for name in [
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_ENCODING,
        ] {
            if let Some(value) = response
                .header(name.clone())
                .and_then(|v| HeaderValue::from_str(v).ok())
            {
                response_headers.insert(name, value);
            }
        }

        // 200 or 206, never anything else at this point
        let status = response.status();
        debug!("Streaming segment ({})", status);

        (status, response_headers, Body::from_stream(response.into_stream())).into_response()
    }

    /// rewritten manifest, compressed when the client allows it
    fn manifest_response(rewritten: &str, headers: &HeaderMap) -> AppResult<Response> {
        let encoding = ContentEncoding::negotiate(
            headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        );

        let mut response_headers = HeaderMap::new();
        Self::insert_cors_headers(&mut response_headers);
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(MANIFEST_CONTENT_TYPE),
        );
        response_headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(MANIFEST_CACHE_CONTROL),
        );

        let body = encoding.compress(rewritten.as_bytes()).map_err(|e| {
            error!("Failed to compress manifest with {:?}: {}", encoding, e);
            Error::InternalServerErrorWithContext("Failed to compress response".to_string())
        })?;

        if let Some(value) = encoding.as_header_value() {
            response_headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(value));
            debug!(
                "Compressed manifest with {:?} from {} to {} bytes",
                encoding,
                rewritten.len(),
                body.len()
            );
        }

        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        Ok((StatusCode::OK, response_headers, body).into_response())
    }
}
