//! Rating mutations and the events they produce.
//!
//! Every write goes through [`RatingCoordinator`]: the store write commits
//! first, then exactly one [`RatingEvent`] is handed to the publisher. The
//! caller's result depends on the store write alone.

pub mod locks;

use std::sync::Arc;

use crate::{
    db::RatingStore,
    errors::AppError,
    events::EventPublisher,
    models::{
        CourseRatingStats, NewRating, Rating, RatingEvent, RatingEventType,
        rating::validate_score,
    },
};

pub use locks::KeyedLocks;

/// Lookup-then-write rounds before an upsert gives up. The second round only
/// happens when another writer slipped in between lookup and write.
const UPSERT_ATTEMPTS: usize = 3;

pub struct RatingCoordinator {
    store: Arc<dyn RatingStore>,
    publisher: Arc<dyn EventPublisher>,
    locks: KeyedLocks<(i64, i64)>,
}

impl RatingCoordinator {
    pub fn new(store: Arc<dyn RatingStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            locks: KeyedLocks::new(),
        }
    }

    /// Creates the caller's rating for `course_id`, or replaces the score and
    /// review of the one that already exists.
    ///
    /// Upserts for the same pair are serialized in-process. Across processes
    /// the store's unique constraint decides: a losing insert comes back as
    /// [`AppError::Conflict`] and is retried as an update.
    pub async fn upsert(
        &self,
        user_id: i64,
        course_id: i64,
        score: i32,
        review: Option<String>,
    ) -> Result<Rating, AppError> {
        validate_score(score)?;
        if course_id <= 0 {
            return Err(AppError::BadRequest(format!("Invalid course id {}", course_id)));
        }

        let _guard = self.locks.lock((user_id, course_id)).await;

        for attempt in 1..=UPSERT_ATTEMPTS {
            let existing = self
                .store
                .find_by_user_and_course(user_id, course_id)
                .await?;

            let written = match existing {
                Some(existing) => self
                    .store
                    .update(existing.id, score, review.clone())
                    .await?
                    .map(|rating| (rating, RatingEventType::Updated)),
                None => {
                    let new_rating = NewRating {
                        user_id,
                        course_id,
                        score,
                        review: review.clone(),
                    };
                    match self.store.insert(new_rating).await {
                        Ok(rating) => Some((rating, RatingEventType::Created)),
                        Err(AppError::Conflict(msg)) => {
                            tracing::warn!(
                                "Concurrent create for user {} and course {} ({}), retrying as update",
                                user_id,
                                course_id,
                                msg
                            );
                            None
                        }
                        Err(e) => return Err(e),
                    }
                }
            };

            if let Some((rating, event_type)) = written {
                self.emit(event_type, &rating);
                return Ok(rating);
            }

            tracing::debug!(
                "Upsert round {} for user {} and course {} lost a race",
                attempt,
                user_id,
                course_id
            );
        }

        Err(AppError::Conflict(format!(
            "Could not settle rating for user {} and course {}",
            user_id, course_id
        )))
    }

    /// Deletes a rating owned by `user_id`. Ownership is checked before any
    /// write.
    pub async fn delete(&self, user_id: i64, rating_id: i64) -> Result<(), AppError> {
        let rating = self
            .store
            .find_by_id(rating_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating not found with id: {}", rating_id)))?;

        if rating.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own ratings".into(),
            ));
        }

        let _guard = self.locks.lock((rating.user_id, rating.course_id)).await;

        let deleted = self
            .store
            .delete(rating_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating not found with id: {}", rating_id)))?;

        self.emit(RatingEventType::Deleted, &deleted);
        Ok(())
    }

    pub async fn get(&self, rating_id: i64) -> Result<Rating, AppError> {
        self.store
            .find_by_id(rating_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating not found with id: {}", rating_id)))
    }

    pub async fn for_user(&self, user_id: i64) -> Result<Vec<Rating>, AppError> {
        self.store.find_by_user(user_id).await
    }

    pub async fn for_course(&self, course_id: i64) -> Result<Vec<Rating>, AppError> {
        self.store.find_by_course(course_id).await
    }

    pub async fn for_user_and_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Rating, AppError> {
        self.store
            .find_by_user_and_course(user_id, course_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Rating not found for user {} and course {}",
                    user_id, course_id
                ))
            })
    }

    pub async fn course_stats(&self, course_id: i64) -> Result<CourseRatingStats, AppError> {
        let totals = self.store.course_totals(course_id).await?;
        Ok(CourseRatingStats::from_totals(course_id, totals))
    }

    // Runs while the key lock is held so per-key publish order matches
    // commit order.
    fn emit(&self, event_type: RatingEventType, rating: &Rating) {
        let event = RatingEvent::new(event_type, rating);
        self.publisher.publish(event);
        tracing::info!(
            "Rating {} event published for user {} and course {}",
            event_type,
            rating.user_id,
            rating.course_id
        );
    }
}
