use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    db::RatingStore,
    errors::AppError,
    models::{CourseRatingStats, RatingEvent, RatingEventType},
};

/// Write side of the course catalog: receives recomputed aggregates.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn update_aggregate(&self, stats: &CourseRatingStats) -> Result<(), AppError>;
}

pub struct HttpCourseCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCourseCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::EnvError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CourseCatalog for HttpCourseCatalog {
    async fn update_aggregate(&self, stats: &CourseRatingStats) -> Result<(), AppError> {
        let url = format!("{}/api/courses/{}/rating", self.base_url, stats.course_id);
        // The catalog endpoint requires a value even for unrated courses.
        let average = stats.average_rating.unwrap_or(0.0);

        let res = self
            .client
            .put(&url)
            .query(&[
                ("averageRating", average.to_string()),
                ("totalRatings", stats.total_ratings.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to reach course catalog: {}", e)))?;

        match res.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!(
                "Course {} not found in catalog",
                stats.course_id
            ))),
            status => Err(AppError::Transport(format!(
                "Course catalog responded with {} for course {}",
                status, stats.course_id
            ))),
        }
    }
}

/// What became of one event after [`RatingAggregator::apply_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The catalog holds the recomputed aggregate.
    Applied,
    /// The event can never be applied (course unknown to the catalog).
    Skipped,
    /// Every attempt failed on a transient error; the event must not be
    /// acknowledged.
    RetryLater,
}

/// Folds rating events into per-course aggregates.
///
/// Every event triggers a full recompute from the rating store, so applying
/// the same event twice, or events of different keys in any order, converges
/// on the same aggregate.
pub struct RatingAggregator {
    store: Arc<dyn RatingStore>,
    catalog: Arc<dyn CourseCatalog>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn RatingStore>, catalog: Arc<dyn CourseCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn apply(&self, event: &RatingEvent) -> Result<CourseRatingStats, AppError> {
        match event.event_type {
            RatingEventType::Created | RatingEventType::Updated => tracing::debug!(
                "Rating {} by user {} upserted, recomputing course {}",
                event.rating_id,
                event.user_id,
                event.course_id
            ),
            RatingEventType::Deleted => tracing::debug!(
                "Rating {} by user {} removed, recomputing course {}",
                event.rating_id,
                event.user_id,
                event.course_id
            ),
        }

        let totals = self.store.course_totals(event.course_id).await?;
        let stats = CourseRatingStats::from_totals(event.course_id, totals);
        self.catalog.update_aggregate(&stats).await?;

        tracing::info!(
            course_id = stats.course_id,
            average = ?stats.average_rating,
            total = stats.total_ratings,
            event_type = %event.event_type,
            "Course aggregate updated"
        );

        Ok(stats)
    }

    /// Applies with exponential backoff. A course missing from the catalog
    /// is skipped without retrying.
    pub async fn apply_with_retry(
        &self,
        event: &RatingEvent,
        attempts: u32,
        base_delay: Duration,
    ) -> ApplyOutcome {
        for attempt in 0..attempts.max(1) {
            match self.apply(event).await {
                Ok(_) => return ApplyOutcome::Applied,
                Err(AppError::NotFound(msg)) => {
                    tracing::warn!("Skipping {} event: {}", event.event_type, msg);
                    return ApplyOutcome::Skipped;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        course_id = event.course_id,
                        "Failed to apply rating event"
                    );
                    if attempt + 1 < attempts {
                        tokio::time::sleep(base_delay * 2u32.pow(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(
            ?event,
            "Rating event still failing after {} attempts, holding it for redelivery",
            attempts
        );
        ApplyOutcome::RetryLater
    }
}
