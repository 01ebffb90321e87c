use sqlx::PgPool;

use crate::{
    db::rating::RATING_COLUMNS,
    errors::AppError,
    models::{CourseTotals, Rating},
};

pub async fn get_rating_by_id(id: i64, postgres: &PgPool) -> Result<Option<Rating>, AppError> {
    let rating = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch rating {}: {}", id, e)))?;

    Ok(rating)
}

pub async fn get_ratings_by_user(user_id: i64, postgres: &PgPool) -> Result<Vec<Rating>, AppError> {
    let ratings = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 ORDER BY updated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(postgres)
    .await
    .map_err(|e| {
        AppError::DatabaseError(format!("Failed to fetch ratings for user {}: {}", user_id, e))
    })?;

    Ok(ratings)
}

pub async fn get_ratings_by_course(
    course_id: i64,
    postgres: &PgPool,
) -> Result<Vec<Rating>, AppError> {
    let ratings = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE course_id = $1 ORDER BY updated_at DESC"
    ))
    .bind(course_id)
    .fetch_all(postgres)
    .await
    .map_err(|e| {
        AppError::DatabaseError(format!(
            "Failed to fetch ratings for course {}: {}",
            course_id, e
        ))
    })?;

    Ok(ratings)
}

pub async fn get_user_rating_for_course(
    user_id: i64,
    course_id: i64,
    postgres: &PgPool,
) -> Result<Option<Rating>, AppError> {
    let rating = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND course_id = $2"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch rating: {}", e)))?;

    Ok(rating)
}

pub async fn get_course_totals(course_id: i64, postgres: &PgPool) -> Result<CourseTotals, AppError> {
    let totals = sqlx::query_as::<_, CourseTotals>(
        "SELECT COALESCE(SUM(score), 0)::BIGINT AS sum, COUNT(*) AS count
			FROM ratings
			WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(postgres)
    .await
    .map_err(|e| {
        AppError::DatabaseError(format!(
            "Failed to aggregate ratings for course {}: {}",
            course_id, e
        ))
    })?;

    Ok(totals)
}
