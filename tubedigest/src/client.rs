//! HTTP client for the summary API, used by the `tubedigest-client` binary.
//!
//! Every call is a single deadline-bound request: when the deadline expires the
//! call fails with [`ClientError::Timeout`], which callers report as retryable.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub video_url: String,
    pub title: String,
    pub summary: String,
    pub thumbnail_url: String,
    pub duration: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stats {
    pub total_summaries: i64,
    pub recent_summaries: i64,
    pub last_summary: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out after {0:?}, please try again")]
    Timeout(Duration),

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Timeouts and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            ClientError::Http(e) => e.is_timeout() || e.is_connect(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    deadline: Duration,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            deadline: DEFAULT_DEADLINE,
            http: Client::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn summarize(&self, url: &str) -> Result<Summary, ClientError> {
        let body = serde_json::json!({ "url": url });
        self.send_json(self.request(Method::POST, "/api/summaries/summarize").json(&body))
            .await
    }

    pub async fn list(&self) -> Result<Vec<Summary>, ClientError> {
        self.send_json(self.request(Method::GET, "/api/summaries")).await
    }

    pub async fn recent(&self) -> Result<Vec<Summary>, ClientError> {
        self.send_json(self.request(Method::GET, "/api/summaries/recent")).await
    }

    pub async fn stats(&self) -> Result<Stats, ClientError> {
        self.send_json(self.request(Method::GET, "/api/summaries/stats")).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let path = format!("/api/summaries/{}", id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn clear_history(&self) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, "/api/summaries/clear_history"))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        self.within_deadline(async {
            let response = check_status(builder.send().await?).await?;
            Ok(response.json::<T>().await?)
        })
        .await
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        self.within_deadline(async {
            check_status(builder.send().await?).await?;
            Ok(())
        })
        .await
    }

    async fn within_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        tokio::time::timeout(self.deadline, call)
            .await
            .map_err(|_| ClientError::Timeout(self.deadline))?
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or_else(|_| fallback_message(status, &text));
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    if text.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.trim().to_string()
    }
}
