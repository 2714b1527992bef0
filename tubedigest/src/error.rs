use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The submitted URL was rejected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("url is required")]
    MissingUrl,

    #[error("enter a valid URL: {0}")]
    Malformed(String),

    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
}

/// Why a single video-info source could not produce a result.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to run {program}: {reason}")]
    Command { program: String, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("returned status {0}")]
    Status(u16),

    #[error("unreadable metadata: {0}")]
    Parse(String),

    #[error("video title is empty")]
    MissingTitle,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// One failed attempt, tagged with the source that produced it.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: &'static str,
    pub error: SourceError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Every video-info source failed for `url`.
#[derive(Debug)]
pub struct ResolutionError {
    pub url: String,
    pub failures: Vec<SourceFailure>,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error fetching video info for {}", self.url)?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionError {}

/// Failure of one summary strategy. Never leaves the generator.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("completion provider failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("completion was empty")]
    EmptyCompletion,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("summarization did not finish within {0:?}, please try again")]
    DeadlineExceeded(Duration),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}
