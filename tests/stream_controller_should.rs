mod common;

use axum::http::{StatusCode, header};
use hls_relay::server::services::token_issuer_services::IssueError;

use common::*;

const VLC: &str = "VLC/3.0.20 LibVLC/3.0.20";
const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

fn channels() -> Vec<hls_relay::database::channel::ChannelDescriptor> {
    vec![
        channel("0-9-news", "https://cdn.example/news/index.m3u8"),
        channel("0-9-movies", "https://cdn.example/movies/index.m3u8?region=in"),
    ]
}

#[tokio::test]
async fn redirect_with_token_appended() {
    let issuer = CountingIssuer::ok("hdntl=exp=1~hmac=ff");
    let router = router(channels(), issuer.clone());

    let response = send(&router, "/api/v1/stream?id=0-9-news", Some(BROWSER)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://cdn.example/news/index.m3u8?hdntl=exp=1~hmac=ff"
    );

    let response = send(&router, "/api/v1/stream?id=0-9-movies", Some(BROWSER)).await;
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://cdn.example/movies/index.m3u8?region=in&hdntl=exp=1~hmac=ff"
    );

    // same agent, one issuance
    assert_eq!(issuer.calls(), 1);
}

#[tokio::test]
async fn reject_unknown_channel_without_issuing() {
    let issuer = CountingIssuer::ok("hdntl=t");
    let router = router(channels(), issuer.clone());

    let response = send(&router, "/api/v1/stream?id=nope", Some(BROWSER)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(issuer.calls(), 0);
}

#[tokio::test]
async fn reject_missing_id() {
    let issuer = CountingIssuer::ok("hdntl=t");
    let router = router(channels(), issuer.clone());

    let response = send(&router, "/api/v1/stream", Some(BROWSER)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(issuer.calls(), 0);
}

#[tokio::test]
async fn fail_when_no_token_can_be_issued() {
    let issuer = CountingIssuer::failing(IssueError::Status(503));
    let router = router(channels(), issuer.clone());

    let response = send(&router, "/api/v1/stream?id=0-9-news", Some(BROWSER)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // failures aren't cached, the next request asks again
    let response = send(&router, "/api/v1/stream?id=0-9-news", Some(BROWSER)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(issuer.calls(), 2);
}

#[tokio::test]
async fn hand_media_players_the_url_as_text() {
    let router = router(channels(), CountingIssuer::ok("hdntl=t"));

    let response = send(&router, "/api/v1/stream?id=0-9-news", Some(VLC)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_bytes(response).await,
        b"https://cdn.example/news/index.m3u8?hdntl=t"
    );

    let response = send(&router, "/api/v1/stream?id=0-9-news&format=url", Some(BROWSER)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn describe_the_stream_as_json() {
    let router = router(channels(), CountingIssuer::ok("hdntl=t"));

    let response = send(&router, "/api/v1/get-stream-url?id=0-9-news", Some(BROWSER)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["channel"]["id"], "0-9-news");
    assert_eq!(
        json["stream_url"],
        "https://cdn.example/news/index.m3u8?hdntl=t"
    );
    assert!(json["expires_in"].as_u64().unwrap() > 43_000);

    let response = send(&router, "/api/v1/get-stream-url?id=nope", Some(BROWSER)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Channel not found");
}

#[tokio::test]
async fn list_and_filter_channels() {
    let router = router(channels(), CountingIssuer::ok("hdntl=t"));

    let response = send(&router, "/api/v1/channels?search=movies", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["channels"][0]["id"], "0-9-movies");
}

#[tokio::test]
async fn summarize_channel_facets() {
    let mut channels = channels();
    channels[1].genre = "Movies".to_string();
    channels[1].country = "GB".to_string();
    let router = router(channels, CountingIssuer::ok("hdntl=t"));

    let response = send(&router, "/api/v1/channels/stats", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["genres"], serde_json::json!(["Movies", "News"]));
    assert_eq!(json["languages"], serde_json::json!(["en"]));
    assert_eq!(json["countries"], serde_json::json!(["GB", "IN"]));
}

#[tokio::test]
async fn report_health_without_redis() {
    let router = router(channels(), CountingIssuer::ok("hdntl=t"));

    let response = send(&router, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["services"]["redis"]["status"], "disabled");
    assert_eq!(json["services"]["catalog"]["channels"], 2);
}
