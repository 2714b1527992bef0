use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{VideoInfo, VideoInfoSource, NO_DESCRIPTION, UNKNOWN_DURATION};
use crate::error::SourceError;

/// Primary source: the metadata dump of the `yt-dlp` tool.
pub struct YtDlpSource {
    program: String,
    timeout: Duration,
}

/// Subset of `yt-dlp --dump-json` that we read.
#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    description: Option<String>,
}

impl YtDlpSource {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command_error(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Command {
            program: self.program.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl VideoInfoSource for YtDlpSource {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, url: &str) -> Result<VideoInfo, SourceError> {
        debug!(program = %self.program, %url, "running metadata dump");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .arg("--dump-json")
                .arg("--no-playlist")
                .arg("--skip-download")
                .arg("--no-warnings")
                .arg(url)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| SourceError::Timeout(self.timeout))?
        .map_err(|e| self.command_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.command_error(format!("{}: {}", output.status, stderr.trim())));
        }

        let metadata: YtDlpMetadata = serde_json::from_slice(&output.stdout)
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        into_video_info(metadata)
    }
}

fn into_video_info(metadata: YtDlpMetadata) -> Result<VideoInfo, SourceError> {
    let title = metadata
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(SourceError::MissingTitle)?;

    let duration = metadata
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| (d.round() as u64).to_string())
        .unwrap_or_else(|| UNKNOWN_DURATION.to_string());

    let description = metadata
        .description
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    Ok(VideoInfo {
        title,
        thumbnail_url: metadata.thumbnail.unwrap_or_default(),
        duration,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<VideoInfo, SourceError> {
        into_video_info(serde_json::from_str(json).expect("metadata json"))
    }

    #[test]
    fn full_metadata() {
        let info = parse(
            r#"{"id":"abc","title":"Rust in 100 Seconds","thumbnail":"https://i.ytimg.com/vi/abc/hq.jpg",
                "duration":149.0,"description":"Rust is fast. It is safe."}"#,
        )
        .expect("info");

        assert_eq!(info.title, "Rust in 100 Seconds");
        assert_eq!(info.thumbnail_url, "https://i.ytimg.com/vi/abc/hq.jpg");
        assert_eq!(info.duration, "149");
        assert_eq!(info.description, "Rust is fast. It is safe.");
    }

    #[test]
    fn missing_description_is_not_an_error() {
        let info = parse(r#"{"title":"Clip","duration":12,"description":""}"#).expect("info");
        assert_eq!(info.description, NO_DESCRIPTION);
        assert_eq!(info.thumbnail_url, "");
    }

    #[test]
    fn missing_duration_is_unknown() {
        let info = parse(r#"{"title":"Live stream"}"#).expect("info");
        assert_eq!(info.duration, UNKNOWN_DURATION);
    }

    #[test]
    fn empty_title_fails_the_source() {
        assert!(matches!(
            parse(r#"{"title":"  ","duration":5}"#),
            Err(SourceError::MissingTitle)
        ));
    }
}
