use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    db::RatingStore,
    errors::AppError,
    models::{CourseTotals, NewRating, Rating},
};

/// In-process rating table with the same uniqueness rule as the Postgres
/// schema. Used by the test suite and local runs without a database.
#[derive(Default)]
pub struct MemoryRatingStore {
    inner: Mutex<MemoryTable>,
}

#[derive(Default)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Rating>,
}

impl MemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RatingStore for MemoryRatingStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Rating>, AppError> {
        Ok(self.inner.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Rating>, AppError> {
        let table = self.inner.lock().await;
        Ok(table
            .rows
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_course(&self, course_id: i64) -> Result<Vec<Rating>, AppError> {
        let table = self.inner.lock().await;
        Ok(table
            .rows
            .values()
            .filter(|r| r.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Rating>, AppError> {
        let table = self.inner.lock().await;
        Ok(table
            .rows
            .values()
            .find(|r| r.user_id == user_id && r.course_id == course_id)
            .cloned())
    }

    async fn insert(&self, rating: NewRating) -> Result<Rating, AppError> {
        let mut table = self.inner.lock().await;

        let taken = table
            .rows
            .values()
            .any(|r| r.user_id == rating.user_id && r.course_id == rating.course_id);
        if taken {
            return Err(AppError::Conflict(format!(
                "Rating already exists for user {} and course {}",
                rating.user_id, rating.course_id
            )));
        }

        table.next_id += 1;
        let now = Utc::now();
        let row = Rating {
            id: table.next_id,
            user_id: rating.user_id,
            course_id: rating.course_id,
            score: rating.score,
            review: rating.review,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(row.id, row.clone());

        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        score: i32,
        review: Option<String>,
    ) -> Result<Option<Rating>, AppError> {
        let mut table = self.inner.lock().await;
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };

        row.score = score;
        row.review = review;
        row.updated_at = Utc::now();

        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<Option<Rating>, AppError> {
        Ok(self.inner.lock().await.rows.remove(&id))
    }

    async fn course_totals(&self, course_id: i64) -> Result<CourseTotals, AppError> {
        let table = self.inner.lock().await;
        let totals = table
            .rows
            .values()
            .filter(|r| r.course_id == course_id)
            .fold(CourseTotals::default(), |acc, r| CourseTotals {
                sum: acc.sum + i64::from(r.score),
                count: acc.count + 1,
            });

        Ok(totals)
    }
}
