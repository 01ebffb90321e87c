pub mod memory;
pub mod rating;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    errors::AppError,
    models::{CourseTotals, NewRating, Rating},
};

pub use memory::MemoryRatingStore;
pub use rating::PgRatingStore;

/// Query surface of the rating table. Only the coordinator mutates through
/// it; everything else reads.
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Rating>, AppError>;

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Rating>, AppError>;

    async fn find_by_course(&self, course_id: i64) -> Result<Vec<Rating>, AppError>;

    async fn find_by_user_and_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Rating>, AppError>;

    /// Fails with [`AppError::Conflict`] when a row already exists for the
    /// same `(user_id, course_id)`.
    async fn insert(&self, rating: NewRating) -> Result<Rating, AppError>;

    /// Returns `None` when the row no longer exists.
    async fn update(
        &self,
        id: i64,
        score: i32,
        review: Option<String>,
    ) -> Result<Option<Rating>, AppError>;

    /// Returns the removed row, or `None` when nothing was removed.
    async fn delete(&self, id: i64) -> Result<Option<Rating>, AppError>;

    async fn course_totals(&self, course_id: i64) -> Result<CourseTotals, AppError>;
}

pub async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect to Postgres: {}", e)))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to run migrations: {}", e)))?;

    tracing::info!("Connected to Postgres and applied migrations");

    Ok(pool)
}
