// shared fixtures for the router tests: a fake cdn on localhost and a token issuer that counts
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use hls_relay::{
    AppConfig, ApplicationServer,
    database::channel::ChannelDescriptor,
    server::{
        extractors::ClientIdentity,
        services::{
            AppServices, DynTokenIssuer,
            catalog_services::Catalog,
            token_issuer_services::{IssueError, TokenIssuer},
            upstream_services::MAX_MANIFEST_BYTES,
        },
    },
};
use tower::ServiceExt;

pub const MASTER: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\nlow/index.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=2400000,RESOLUTION=1280x720\nhigh/index.m3u8\n";
pub const VARIANT: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg1.ts\n#EXTINF:6.0,\nseg2.ts\n";
pub const SEGMENT: &[u8] = &[0x47, 0x40, 0x11, 0x10, 0x00, 0x42, 0xf0, 0x25, 0xff, 0x00];

/// a cdn that serves one channel and a 404
pub async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route(
            "/live/master.m3u8",
            get(|| async { ([(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")], MASTER) }),
        )
        .route(
            "/live/low/index.m3u8",
            get(|| async { ([(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")], VARIANT) }),
        )
        .route("/live/low/seg1.ts", get(serve_segment))
        .route(
            "/live/huge.m3u8",
            get(|| async { vec![b'#'; MAX_MANIFEST_BYTES + 1] }),
        )
        .route(
            "/live/gone.m3u8",
            get(|| async { (StatusCode::NOT_FOUND, "gone").into_response() }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

// honours a single "bytes=a-b" range the way a cdn edge does
async fn serve_segment(headers: HeaderMap) -> Response {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)));

    match range {
        Some((start, end)) if start <= end && end < SEGMENT.len() => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, "video/MP2T".to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, SEGMENT.len()),
                ),
            ],
            SEGMENT[start..=end].to_vec(),
        )
            .into_response(),
        _ => (
            [
                (header::CONTENT_TYPE, "video/MP2T"),
                (header::ACCEPT_RANGES, "bytes"),
            ],
            SEGMENT,
        )
            .into_response(),
    }
}

/// an address nothing listens on
pub async fn unreachable_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub struct CountingIssuer {
    pub calls: AtomicUsize,
    pub outcome: Result<String, IssueError>,
}

impl CountingIssuer {
    pub fn ok(token: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Ok(token.to_string()),
        })
    }

    pub fn failing(error: IssueError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Err(error),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenIssuer for CountingIssuer {
    async fn issue(&self, _identity: &ClientIdentity) -> Result<String, IssueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

pub fn channel(id: &str, url: &str) -> ChannelDescriptor {
    ChannelDescriptor {
        id: id.to_string(),
        slug: None,
        name: format!("{} HD", id),
        genre: "News".to_string(),
        language: "en".to_string(),
        url: url.to_string(),
        logo: format!("https://img.example/{}.png", id),
        chno: "101".to_string(),
        country: "IN".to_string(),
    }
}

pub fn router(channels: Vec<ChannelDescriptor>, issuer: DynTokenIssuer) -> Router {
    let config = Arc::new(AppConfig {
        public_url: Some("http://relay.test".to_string()),
        upstream_timeout_seconds: 5,
        ..AppConfig::default()
    });

    let services =
        AppServices::from_parts(config, Catalog::from_channels(channels), issuer, None, None)
            .unwrap();

    ApplicationServer::router(services)
}

pub async fn send(router: &Router, uri: &str, user_agent: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri(uri);
    if let Some(ua) = user_agent {
        request = request.header(header::USER_AGENT, ua);
    }

    router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
