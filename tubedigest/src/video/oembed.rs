use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{VideoInfo, VideoInfoSource, DESCRIPTION_UNAVAILABLE, NO_DESCRIPTION, UNKNOWN_DURATION, UNKNOWN_TITLE};
use crate::error::SourceError;

/// Fallback source: title and thumbnail from the oEmbed endpoint, description
/// scraped from the watch page. Duration is not available on this path.
pub struct OEmbedSource {
    endpoint: String,
    client: Client,
    description_pattern: Regex,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

impl OEmbedSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("TubeDigest/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        // JSON string value of "shortDescription" in the embedded player response
        let description_pattern = Regex::new(r#""shortDescription":"((?:[^"\\]|\\.)*)""#)
            .context("invalid shortDescription pattern")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            description_pattern,
        })
    }

    /// Scrape the description from the watch page. Never fails: a missing field or
    /// non-success status gives "No description available", a transport error gives
    /// "Unable to fetch description".
    pub async fn fetch_description(&self, url: &str) -> String {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, error = %e, "scraping: watch page fetch failed");
                return DESCRIPTION_UNAVAILABLE.to_string();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "scraping: watch page returned non-success status");
            return NO_DESCRIPTION.to_string();
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "scraping: failed to read watch page body");
                return DESCRIPTION_UNAVAILABLE.to_string();
            }
        };

        match self.extract_description(&html) {
            Some(description) => {
                info!(%url, chars = description.chars().count(), "scraping: description extracted");
                description
            }
            None => NO_DESCRIPTION.to_string(),
        }
    }

    fn extract_description(&self, html: &str) -> Option<String> {
        let raw = self.description_pattern.captures(html)?.get(1)?.as_str();
        Some(unescape_json_string(raw))
    }
}

/// Decode JSON string escapes (`\n`, `\"`, `é`, ...). Falls back to the raw
/// text when the value is not a valid JSON string body.
fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

#[async_trait::async_trait]
impl VideoInfoSource for OEmbedSource {
    fn name(&self) -> &'static str {
        "oembed"
    }

    async fn fetch(&self, url: &str) -> Result<VideoInfo, SourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let description = self.fetch_description(url).await;

        Ok(VideoInfo {
            title: body
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            thumbnail_url: body.thumbnail_url.unwrap_or_default(),
            duration: UNKNOWN_DURATION.to_string(),
            description,
        })
    }
}
