use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    models::{CourseRatingStats, Rating},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCoursePayload {
    pub course_id: i64,
    #[serde(alias = "score")]
    pub rating: i32,
    pub review: Option<String>,
}

#[axum::debug_handler]
pub async fn upsert_rating_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RateCoursePayload>,
) -> Result<(StatusCode, Json<Rating>), (StatusCode, String)> {
    match state
        .ratings
        .upsert(user_id, payload.course_id, payload.rating, payload.review)
        .await
    {
        Ok(rating) => Ok((StatusCode::CREATED, Json(rating))),
        Err(err) => {
            tracing::error!(
                "Error rating course {} for user {}: {}",
                payload.course_id,
                user_id,
                err
            );
            Err(err.to_response())
        }
    }
}

pub async fn delete_rating_handler(
    Path(rating_id): Path<i64>,
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .ratings
        .delete(user_id, rating_id)
        .await
        .map_err(|e| {
            tracing::warn!("Error deleting rating {}: {}", rating_id, e);
            e.to_response()
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_rating_handler(
    Path(rating_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Rating>, (StatusCode, String)> {
    let rating = state
        .ratings
        .get(rating_id)
        .await
        .map_err(|e| e.to_response())?;

    Ok(Json(rating))
}

pub async fn get_user_ratings_handler(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Rating>>, (StatusCode, String)> {
    let ratings = state.ratings.for_user(user_id).await.map_err(|e| {
        tracing::error!("Failed to list ratings for user {}: {}", user_id, e);
        e.to_response()
    })?;

    Ok(Json(ratings))
}

pub async fn get_course_ratings_handler(
    Path(course_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Rating>>, (StatusCode, String)> {
    let ratings = state.ratings.for_course(course_id).await.map_err(|e| {
        tracing::error!("Failed to list ratings for course {}: {}", course_id, e);
        e.to_response()
    })?;

    Ok(Json(ratings))
}

pub async fn get_user_course_rating_handler(
    Path((user_id, course_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
) -> Result<Json<Rating>, (StatusCode, String)> {
    let rating = state
        .ratings
        .for_user_and_course(user_id, course_id)
        .await
        .map_err(|e| e.to_response())?;

    Ok(Json(rating))
}

pub async fn get_course_stats_handler(
    Path(course_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CourseRatingStats>, (StatusCode, String)> {
    let stats = state.ratings.course_stats(course_id).await.map_err(|e| {
        tracing::error!("Failed to compute stats for course {}: {}", course_id, e);
        e.to_response()
    })?;

    Ok(Json(stats))
}

pub async fn get_my_ratings_handler(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Rating>>, (StatusCode, String)> {
    let ratings = state
        .ratings
        .for_user(user_id)
        .await
        .map_err(|e| e.to_response())?;

    Ok(Json(ratings))
}
