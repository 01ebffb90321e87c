#[tokio::main]
async fn main() {
    if let Err(e) = course_ratings::start_server().await {
        tracing::error!("Rating service failed: {}", e);
        eprintln!("Rating service failed: {e}");
        std::process::exit(1);
    }
}
