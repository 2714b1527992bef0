use std::time::Duration;

use common::VideoConfig;
use mockito::Matcher;
use tubedigest::error::SourceError;
use tubedigest::video::{
    OEmbedSource, VideoInfoResolver, VideoInfoSource, YtDlpSource, DESCRIPTION_UNAVAILABLE,
    NO_DESCRIPTION, UNKNOWN_DURATION, UNKNOWN_TITLE,
};

const WATCH_PAGE: &str = r#"<html><head><title>Video</title></head><body>
<script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"abc123","title":"Ownership",
"shortDescription":"Rust ownership in ten minutes.\nBorrowing. Lifetimes. Moves.","isPrivate":false}};</script>
</body></html>"#;

fn oembed_source(server: &mockito::ServerGuard) -> OEmbedSource {
    OEmbedSource::new(format!("{}/oembed", server.url()), Duration::from_secs(5)).expect("source")
}

#[tokio::test]
async fn oembed_source_combines_metadata_and_page_description() {
    let mut server = mockito::Server::new_async().await;
    let video_url = format!("{}/watch?v=abc123", server.url());

    let oembed = server
        .mock("GET", "/oembed")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("url".into(), video_url.clone()),
            Matcher::UrlEncoded("format".into(), "json".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"title": "Rust Ownership", "author_name": "Chan",
                "thumbnail_url": "https://i.ytimg.com/vi/abc123/hqdefault.jpg"}"#,
        )
        .create_async()
        .await;
    let page = server
        .mock("GET", "/watch")
        .match_query(Matcher::UrlEncoded("v".into(), "abc123".into()))
        .with_status(200)
        .with_body(WATCH_PAGE)
        .create_async()
        .await;

    let info = oembed_source(&server).fetch(&video_url).await.expect("video info");

    assert_eq!(info.title, "Rust Ownership");
    assert_eq!(info.thumbnail_url, "https://i.ytimg.com/vi/abc123/hqdefault.jpg");
    assert_eq!(info.duration, UNKNOWN_DURATION);
    assert_eq!(
        info.description,
        "Rust ownership in ten minutes.\nBorrowing. Lifetimes. Moves."
    );

    oembed.assert_async().await;
    page.assert_async().await;
}

#[tokio::test]
async fn oembed_missing_fields_use_defaults() {
    let mut server = mockito::Server::new_async().await;
    let video_url = format!("{}/watch?v=abc123", server.url());

    let _oembed = server
        .mock("GET", "/oembed")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"type": "video"}"#)
        .create_async()
        .await;
    let _page = server
        .mock("GET", "/watch")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html><body>no player response here</body></html>")
        .create_async()
        .await;

    let info = oembed_source(&server).fetch(&video_url).await.expect("video info");

    assert_eq!(info.title, UNKNOWN_TITLE);
    assert_eq!(info.thumbnail_url, "");
    assert_eq!(info.description, NO_DESCRIPTION);
}

#[tokio::test]
async fn oembed_error_status_is_a_source_failure() {
    let mut server = mockito::Server::new_async().await;
    let video_url = format!("{}/watch?v=gone", server.url());

    let _oembed = server
        .mock("GET", "/oembed")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body("Not Found")
        .create_async()
        .await;

    let err = oembed_source(&server).fetch(&video_url).await.unwrap_err();
    assert!(matches!(err, SourceError::Status(404)));
}

#[tokio::test]
async fn description_page_errors_never_fail_the_lookup() {
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/watch")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let source = oembed_source(&server);
    let missing = source
        .fetch_description(&format!("{}/watch?v=abc123", server.url()))
        .await;
    assert_eq!(missing, NO_DESCRIPTION);

    // Nothing listens on port 1
    let unreachable = source.fetch_description("http://127.0.0.1:1/watch?v=abc123").await;
    assert_eq!(unreachable, DESCRIPTION_UNAVAILABLE);
}

#[tokio::test]
async fn missing_ytdlp_binary_falls_back_to_oembed() {
    let mut server = mockito::Server::new_async().await;
    let video_url = format!("{}/watch?v=abc123", server.url());

    let _oembed = server
        .mock("GET", "/oembed")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"title": "Rust Ownership", "thumbnail_url": "t.jpg"}"#)
        .create_async()
        .await;
    let _page = server
        .mock("GET", "/watch")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(WATCH_PAGE)
        .create_async()
        .await;

    let config = VideoConfig {
        ytdlp_path: "/nonexistent/yt-dlp".to_string(),
        oembed_url: format!("{}/oembed", server.url()),
        fetch_timeout_seconds: 5,
    };
    let resolver = VideoInfoResolver::new(&config).expect("resolver");
    assert_eq!(resolver.source_names(), vec!["yt-dlp", "oembed"]);

    let info = resolver.resolve(&video_url).await.expect("resolved by fallback");
    assert_eq!(info.title, "Rust Ownership");
    assert_eq!(info.duration, UNKNOWN_DURATION);
}

#[tokio::test]
async fn every_source_failing_reports_each_failure() {
    let mut server = mockito::Server::new_async().await;
    let video_url = format!("{}/watch?v=abc123", server.url());

    let _oembed = server
        .mock("GET", "/oembed")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let config = VideoConfig {
        ytdlp_path: "/nonexistent/yt-dlp".to_string(),
        oembed_url: format!("{}/oembed", server.url()),
        fetch_timeout_seconds: 5,
    };
    let resolver = VideoInfoResolver::new(&config).expect("resolver");

    let err = resolver.resolve(&video_url).await.unwrap_err();
    assert_eq!(err.failures.len(), 2);
    assert_eq!(err.failures[0].source, "yt-dlp");
    assert!(matches!(err.failures[0].error, SourceError::Command { .. }));
    assert!(matches!(err.failures[1].error, SourceError::Status(500)));

    let message = err.to_string();
    assert!(message.starts_with("Error fetching video info for "));
    assert!(message.contains("oembed: returned status 500"));
}

#[cfg(unix)]
mod fake_ytdlp {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Write an executable shell script standing in for yt-dlp.
    fn write_script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[tokio::test]
    async fn metadata_dump_is_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(
            &dir,
            r#"cat <<'JSON'
{"id":"abc123","title":"Rust Ownership","thumbnail":"https://i.ytimg.com/vi/abc123/maxres.jpg","duration":612.4,"description":"Ownership. Borrowing. Lifetimes. Moves."}
JSON"#,
        );

        let source = YtDlpSource::new(script.to_string_lossy(), Duration::from_secs(5));
        let info = source
            .fetch("https://www.youtube.com/watch?v=abc123")
            .await
            .expect("video info");

        assert_eq!(info.title, "Rust Ownership");
        assert_eq!(info.thumbnail_url, "https://i.ytimg.com/vi/abc123/maxres.jpg");
        assert_eq!(info.duration, "612");
        assert_eq!(info.description, "Ownership. Borrowing. Lifetimes. Moves.");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_command_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(&dir, "echo 'ERROR: Video unavailable' >&2\nexit 1");

        let source = YtDlpSource::new(script.to_string_lossy(), Duration::from_secs(5));
        let err = source
            .fetch("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap_err();

        match err {
            SourceError::Command { reason, .. } => assert!(reason.contains("Video unavailable")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_tool_hits_the_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(&dir, "sleep 5");

        let source = YtDlpSource::new(script.to_string_lossy(), Duration::from_millis(200));
        let err = source
            .fetch("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Timeout(_)));
    }
}
