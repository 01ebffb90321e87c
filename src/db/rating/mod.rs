pub mod delete;
pub mod get;
pub mod post;
pub mod put;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    db::RatingStore,
    errors::AppError,
    models::{CourseTotals, NewRating, Rating},
};

pub(crate) const RATING_COLUMNS: &str =
    "id, user_id, course_id, score, review, created_at, updated_at";

#[derive(Clone)]
pub struct PgRatingStore {
    postgres: PgPool,
}

impl PgRatingStore {
    pub fn new(postgres: PgPool) -> Self {
        Self { postgres }
    }
}

#[async_trait]
impl RatingStore for PgRatingStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Rating>, AppError> {
        get::get_rating_by_id(id, &self.postgres).await
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Rating>, AppError> {
        get::get_ratings_by_user(user_id, &self.postgres).await
    }

    async fn find_by_course(&self, course_id: i64) -> Result<Vec<Rating>, AppError> {
        get::get_ratings_by_course(course_id, &self.postgres).await
    }

    async fn find_by_user_and_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Rating>, AppError> {
        get::get_user_rating_for_course(user_id, course_id, &self.postgres).await
    }

    async fn insert(&self, rating: NewRating) -> Result<Rating, AppError> {
        post::insert_rating(rating, &self.postgres).await
    }

    async fn update(
        &self,
        id: i64,
        score: i32,
        review: Option<String>,
    ) -> Result<Option<Rating>, AppError> {
        put::update_rating(id, score, review, &self.postgres).await
    }

    async fn delete(&self, id: i64) -> Result<Option<Rating>, AppError> {
        delete::delete_rating(id, &self.postgres).await
    }

    async fn course_totals(&self, course_id: i64) -> Result<CourseTotals, AppError> {
        get::get_course_totals(course_id, &self.postgres).await
    }
}
