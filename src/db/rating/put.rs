use sqlx::PgPool;

use crate::{db::rating::RATING_COLUMNS, errors::AppError, models::Rating};

pub async fn update_rating(
    id: i64,
    score: i32,
    review: Option<String>,
    postgres: &PgPool,
) -> Result<Option<Rating>, AppError> {
    let updated = sqlx::query_as::<_, Rating>(&format!(
        "UPDATE ratings
        SET score = $2, review = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {RATING_COLUMNS}"
    ))
    .bind(id)
    .bind(score)
    .bind(review)
    .fetch_optional(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to update rating {}: {}", id, e)))?;

    Ok(updated)
}
