//! Video metadata resolution.
//!
//! A [`VideoInfoResolver`] holds an ordered list of [`VideoInfoSource`]s. The
//! default order is the `yt-dlp` metadata dump followed by the oEmbed endpoint
//! plus a watch-page scrape for the description. The first source that returns
//! [`VideoInfo`] wins. When all of them fail, every classified failure is
//! returned inside [`ResolutionError`].

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use common::VideoConfig;

use crate::error::{ResolutionError, SourceError, SourceFailure, ValidationError};

pub mod oembed;
pub mod ytdlp;

pub use oembed::OEmbedSource;
pub use ytdlp::YtDlpSource;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_DURATION: &str = "Unknown";
pub const NO_DESCRIPTION: &str = "No description available";
pub const DESCRIPTION_UNAVAILABLE: &str = "Unable to fetch description";

const SHORT_LINK_HOSTS: [&str; 2] = ["youtu.be", "www.youtu.be"];

/// Metadata needed to summarize and display a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail_url: String,
    /// Whole seconds, or "Unknown"
    pub duration: String,
    pub description: String,
}

/// Reject input that is not an absolute http(s) URL with a host.
pub fn validate_url(raw: &str) -> Result<Url, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingUrl);
    }

    let url = Url::parse(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::Malformed("missing host".to_string()));
    }
    Ok(url)
}

/// Drop everything from the first '&' and rewrite short links to the canonical
/// `watch?v=<id>` form.
pub fn normalize_url(raw: &str) -> String {
    let base = raw.trim().split('&').next().unwrap_or_default();

    if let Ok(url) = Url::parse(base) {
        let is_short_link = url
            .host_str()
            .map_or(false, |host| SHORT_LINK_HOSTS.contains(&host));
        if is_short_link {
            let video_id = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .unwrap_or_default();
            return format!("https://www.youtube.com/watch?v={}", video_id);
        }
    }

    base.to_string()
}

/// One way of obtaining [`VideoInfo`] for a normalized URL.
#[async_trait::async_trait]
pub trait VideoInfoSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<VideoInfo, SourceError>;
}

pub struct VideoInfoResolver {
    sources: Vec<Box<dyn VideoInfoSource>>,
}

impl VideoInfoResolver {
    /// yt-dlp first, oEmbed + page scrape as the fallback.
    pub fn new(config: &VideoConfig) -> Result<Self> {
        Ok(Self::with_sources(vec![
            Box::new(YtDlpSource::new(&config.ytdlp_path, config.fetch_timeout())),
            Box::new(OEmbedSource::new(&config.oembed_url, config.fetch_timeout())?),
        ]))
    }

    pub fn with_sources(sources: Vec<Box<dyn VideoInfoSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, url: &str) -> Result<VideoInfo, ResolutionError> {
        let normalized = normalize_url(url);
        let mut failures = Vec::new();

        for source in &self.sources {
            match source.fetch(&normalized).await {
                Ok(info) => {
                    info!(source = source.name(), url = %normalized, title = %info.title, "video info resolved");
                    return Ok(info);
                }
                Err(error) => {
                    warn!(source = source.name(), url = %normalized, %error, "video info source failed");
                    failures.push(SourceFailure {
                        source: source.name(),
                        error,
                    });
                }
            }
        }

        Err(ResolutionError {
            url: normalized,
            failures,
        })
    }
}
