use sqlx::PgPool;

use crate::{db::rating::RATING_COLUMNS, errors::AppError, models::Rating};

pub async fn delete_rating(id: i64, postgres: &PgPool) -> Result<Option<Rating>, AppError> {
    let deleted = sqlx::query_as::<_, Rating>(&format!(
        "DELETE FROM ratings WHERE id = $1 RETURNING {RATING_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(postgres)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to delete rating {}: {}", id, e)))?;

    Ok(deleted)
}
