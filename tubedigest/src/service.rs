use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::error::ServiceError;
use crate::llm::summarizer::SummaryGenerator;
use crate::storage::{SummaryContent, SummaryRecord, SummaryStats, SummaryStore};
use crate::video::{normalize_url, validate_url, VideoInfoResolver};

/// Window used by the "recent" listing and the stats endpoint.
pub const RECENT_DAYS: i64 = 7;

/// Resolver → generator → store. Every operation is scoped to one owner.
pub struct SummaryService {
    resolver: VideoInfoResolver,
    generator: SummaryGenerator,
    store: SummaryStore,
}

impl SummaryService {
    pub fn new(resolver: VideoInfoResolver, generator: SummaryGenerator, store: SummaryStore) -> Self {
        Self {
            resolver,
            generator,
            store,
        }
    }

    pub fn generator(&self) -> &SummaryGenerator {
        &self.generator
    }

    /// Resolve the video, summarize its description and upsert the record keyed by
    /// (owner, normalized url). Nothing is written when resolution fails.
    pub async fn summarize(&self, owner_id: i64, url: &str) -> Result<SummaryRecord, ServiceError> {
        validate_url(url)?;
        let video_url = normalize_url(url);

        let video = self.resolver.resolve(&video_url).await?;
        let summary = self.generator.generate(&video.description).await;

        let content = SummaryContent {
            title: video.title,
            summary,
            thumbnail_url: video.thumbnail_url,
            duration: video.duration,
        };

        let record = self.store.upsert(owner_id, &video_url, &content, Utc::now()).await?;
        info!(owner_id, id = record.id, %video_url, "summary stored");
        Ok(record)
    }

    /// `summarize` bounded by a single deadline. Expiry is reported as a retryable
    /// `DeadlineExceeded`; an upsert that had not started yet is abandoned.
    pub async fn summarize_with_deadline(
        &self,
        owner_id: i64,
        url: &str,
        deadline: Duration,
    ) -> Result<SummaryRecord, ServiceError> {
        match tokio::time::timeout(deadline, self.summarize(owner_id, url)).await {
            Ok(result) => result,
            Err(_) => {
                error!(owner_id, %url, ?deadline, "summarize deadline exceeded");
                Err(ServiceError::DeadlineExceeded(deadline))
            }
        }
    }

    pub async fn list(&self, owner_id: i64) -> Result<Vec<SummaryRecord>, ServiceError> {
        Ok(self.store.list(owner_id).await?)
    }

    pub async fn list_recent(&self, owner_id: i64, since_days: i64) -> Result<Vec<SummaryRecord>, ServiceError> {
        let since = Utc::now() - chrono::Duration::days(since_days);
        Ok(self.store.list_since(owner_id, since).await?)
    }

    pub async fn get(&self, owner_id: i64, id: i64) -> Result<Option<SummaryRecord>, ServiceError> {
        Ok(self.store.get(owner_id, id).await?)
    }

    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<bool, ServiceError> {
        Ok(self.store.delete(owner_id, id).await?)
    }

    pub async fn stats(&self, owner_id: i64) -> Result<SummaryStats, ServiceError> {
        let since = Utc::now() - chrono::Duration::days(RECENT_DAYS);
        Ok(self.store.stats(owner_id, since).await?)
    }

    pub async fn clear_all(&self, owner_id: i64) -> Result<u64, ServiceError> {
        Ok(self.store.clear(owner_id).await?)
    }
}
