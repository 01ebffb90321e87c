pub mod auth;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod errors;
pub mod events;
pub mod http;
mod middleware;
pub mod models;
pub mod state;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, middleware as axum_middleware};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{
    auth::TokenDelegate,
    config::Config,
    coordinator::RatingCoordinator,
    db::PgRatingStore,
    errors::AppError,
    events::KafkaRatingPublisher,
    middleware::{cors_layer, create_global_rate_limiter, rate_limit_middleware},
    state::AppState,
};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn build_app(state: AppState, config: &Config) -> Router {
    let rate_limiter = create_global_rate_limiter(config.rate_limit_per_minute);

    Router::new()
        .merge(http::create_http_routes(state))
        .layer(axum_middleware::from_fn(move |req, next| {
            rate_limit_middleware(rate_limiter.clone(), req, next)
        }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.allowed_origins)),
        )
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
}

pub async fn start_server() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::load()?;

    let postgres = db::connect(&config.database_url).await?;
    let publisher = Arc::new(KafkaRatingPublisher::new(
        &config.kafka_brokers,
        config.ratings_topic.clone(),
        config.publish_timeout,
    )?);
    let authenticator = Arc::new(TokenDelegate::new(
        &config.identity_url,
        config.identity_timeout,
    )?);

    let state = AppState {
        ratings: Arc::new(RatingCoordinator::new(
            Arc::new(PgRatingStore::new(postgres)),
            publisher.clone(),
        )),
        authenticator,
    };

    let app = build_app(state, &config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|e| AppError::EnvError(format!("Failed to bind port {}: {}", config.port, e)))?;

    tracing::info!("Rating service listening on port {}", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::Transport(format!("Server error: {}", e)))?;

    publisher.flush(Duration::from_secs(5));
    tracing::info!("Rating service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
