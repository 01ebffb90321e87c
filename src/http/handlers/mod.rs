pub mod rating;

pub use rating::{
    delete_rating_handler, get_course_ratings_handler, get_course_stats_handler,
    get_my_ratings_handler, get_rating_handler, get_user_course_rating_handler,
    get_user_ratings_handler, upsert_rating_handler,
};

pub async fn health_handler() -> &'static str {
    "ok"
}
