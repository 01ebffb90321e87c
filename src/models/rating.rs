use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

/// One user's rating of one course. At most one row exists per
/// `(user_id, course_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    #[serde(rename = "rating")]
    pub score: i32,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub user_id: i64,
    pub course_id: i64,
    pub score: i32,
    pub review: Option<String>,
}

pub fn validate_score(score: i32) -> Result<(), AppError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Rating must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )))
    }
}
