use sqlx::PgPool;

use crate::{
    db::rating::RATING_COLUMNS,
    errors::AppError,
    models::{NewRating, Rating},
};

/// Plain insert. A concurrent writer that got there first surfaces as
/// [`AppError::Conflict`] through the unique (user_id, course_id) constraint.
pub async fn insert_rating(rating: NewRating, postgres: &PgPool) -> Result<Rating, AppError> {
    let created = sqlx::query_as::<_, Rating>(&format!(
        "INSERT INTO ratings (user_id, course_id, score, review)
        VALUES ($1, $2, $3, $4)
        RETURNING {RATING_COLUMNS}"
    ))
    .bind(rating.user_id)
    .bind(rating.course_id)
    .bind(rating.score)
    .bind(&rating.review)
    .fetch_one(postgres)
    .await
    .map_err(AppError::from)?;

    tracing::debug!(
        "Inserted rating {} for user {} and course {}",
        created.id,
        created.user_id,
        created.course_id
    );

    Ok(created)
}
