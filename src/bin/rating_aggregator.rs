use std::sync::Arc;

use course_ratings::{
    config::AggregatorConfig,
    db::{self, PgRatingStore},
    errors::AppError,
    events::{HttpCourseCatalog, RatingAggregator, consumer::run_aggregator},
};

async fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    course_ratings::init_tracing();

    let config = AggregatorConfig::load()?;
    let postgres = db::connect(&config.database_url).await?;

    let aggregator = RatingAggregator::new(
        Arc::new(PgRatingStore::new(postgres)),
        Arc::new(HttpCourseCatalog::new(
            &config.course_service_url,
            config.catalog_timeout,
        )?),
    );

    run_aggregator(&config, aggregator).await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("Rating aggregator failed: {}", e);
        eprintln!("Rating aggregator failed: {e}");
        std::process::exit(1);
    }
}
