use hls_relay::server::{
    services::manifest_services::ManifestRewriter,
    utils::locator_utils::{ContentKind, OpaqueLocator},
};

const PROXY_BASE: &str = "https://relay.example/api/v1/proxy";

// pulls the locator back out of a rewritten line the way the proxy endpoint would
fn locator_of(line: &str) -> OpaqueLocator {
    let query = line
        .strip_prefix(PROXY_BASE)
        .and_then(|q| q.strip_prefix('?'))
        .unwrap();

    let mut url = None;
    let mut kind = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("url", v)) => url = Some(v),
            Some(("type", v)) => kind = Some(v),
            _ => {}
        }
    }

    OpaqueLocator::decode(url, ContentKind::from_param(kind)).unwrap()
}

#[test]
fn rewrite_a_variant_reference_and_keep_directives() {
    let rewriter = ManifestRewriter::new(PROXY_BASE);
    let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=100\nvariant.m3u8\n";

    let rewritten = rewriter.rewrite(manifest, "https://cdn.example/a/master.m3u8");
    let lines: Vec<&str> = rewritten.split('\n').collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(lines[1], "#EXT-X-STREAM-INF:BANDWIDTH=100");
    assert_eq!(lines[3], "");

    let locator = locator_of(lines[2]);
    assert_eq!(locator.url(), "https://cdn.example/a/variant.m3u8");
    assert_eq!(locator.kind(), ContentKind::Manifest);
}

#[test]
fn resolve_every_reference_form() {
    let rewriter = ManifestRewriter::new(PROXY_BASE);
    let manifest = [
        "#EXTM3U",
        "#EXTINF:6.0,",
        "seg-001.ts",
        "#EXTINF:6.0,",
        "/root/seg-002.m4s?sig=abc",
        "#EXTINF:6.0,",
        "//edge.example/seg-003.aac",
        "#EXTINF:6.0,",
        "https://other.example/x/seg-004.ts",
    ]
    .join("\n");

    let rewritten = rewriter.rewrite(&manifest, "https://cdn.example:8443/live/ch1/index.m3u8?token=abc");
    let references: Vec<OpaqueLocator> = rewritten
        .split('\n')
        .filter(|l| l.starts_with(PROXY_BASE))
        .map(locator_of)
        .collect();

    let urls: Vec<&str> = references.iter().map(|l| l.url()).collect();
    assert_eq!(
        urls,
        vec![
            "https://cdn.example:8443/live/ch1/seg-001.ts",
            "https://cdn.example:8443/root/seg-002.m4s?sig=abc",
            "https://edge.example/seg-003.aac",
            "https://other.example/x/seg-004.ts",
        ]
    );
    assert!(references.iter().all(|l| l.kind() == ContentKind::Segment));
}

#[test]
fn classify_by_path_only() {
    // the query mentions .ts but the path is a playlist
    assert_eq!(
        ManifestRewriter::classify("https://cdn.example/live/index.m3u8?next=chunk.ts"),
        ContentKind::Manifest
    );
    assert_eq!(
        ManifestRewriter::classify("https://cdn.example/live/chunk.m4s?x=1"),
        ContentKind::Segment
    );
    assert_eq!(
        ManifestRewriter::classify("https://cdn.example/subs/en.vtt"),
        ContentKind::Segment
    );
}

#[test]
fn keep_crlf_and_blank_lines_in_place() {
    let rewriter = ManifestRewriter::new(PROXY_BASE);
    let manifest = "#EXTM3U\r\n\r\n#EXTINF:4,\r\n  a.ts  \r\n";

    let rewritten = rewriter.rewrite(manifest, "https://cdn.example/v/index.m3u8");
    let lines: Vec<&str> = rewritten.split('\n').collect();

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "#EXTM3U\r");
    assert_eq!(lines[1], "\r");
    assert!(lines[3].ends_with('\r'));

    let reference = lines[3].trim_end_matches('\r');
    assert!(reference.ends_with("&type=segment"));
    assert_eq!(locator_of(reference).url(), "https://cdn.example/v/a.ts");
}

#[test]
fn keep_variants_on_a_dotted_host_as_manifests() {
    let rewriter = ManifestRewriter::new(PROXY_BASE);
    let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=2000000\nv720.m3u8\n";

    let rewritten = rewriter.rewrite(manifest, "https://stream.tsn.ca/live/master.m3u8");
    let locator = locator_of(rewritten.split('\n').nth(2).unwrap());

    assert_eq!(locator.url(), "https://stream.tsn.ca/live/v720.m3u8");
    assert_eq!(locator.kind(), ContentKind::Manifest);
}

#[test]
fn keep_directory_style_vod_playlists_as_manifests() {
    let rewriter = ManifestRewriter::new(PROXY_BASE);
    let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=900000\nindex-v1-a1.m3u8\n";

    let rewritten = rewriter.rewrite(manifest, "https://vod.example/hls/movie.mp4/master.m3u8");
    let locator = locator_of(rewritten.split('\n').nth(2).unwrap());

    assert_eq!(locator.url(), "https://vod.example/hls/movie.mp4/index-v1-a1.m3u8");
    assert_eq!(locator.kind(), ContentKind::Manifest);
}
