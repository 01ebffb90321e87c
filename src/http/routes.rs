use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    http::handlers::{
        delete_rating_handler, get_course_ratings_handler, get_course_stats_handler,
        get_my_ratings_handler, get_rating_handler, get_user_course_rating_handler,
        get_user_ratings_handler, health_handler, upsert_rating_handler,
    },
    state::AppState,
};

pub fn create_http_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/ratings", post(upsert_rating_handler))
        .route("/api/ratings/my", get(get_my_ratings_handler))
        .route("/api/ratings/stats/{course_id}", get(get_course_stats_handler))
        .route("/api/ratings/user/{user_id}", get(get_user_ratings_handler))
        .route(
            "/api/ratings/user/{user_id}/course/{course_id}",
            get(get_user_course_rating_handler),
        )
        .route("/api/ratings/course/{course_id}", get(get_course_ratings_handler))
        .route(
            "/api/ratings/{id}",
            get(get_rating_handler).delete(delete_rating_handler),
        )
        .with_state(state)
}
