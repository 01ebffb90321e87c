use std::{fmt::Display, str::FromStr, time::Duration};

use tracing::info;

use crate::errors::AppError;

/// Settings for the rating API process.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub identity_url: String,
    pub identity_timeout: Duration,
    pub kafka_brokers: String,
    pub ratings_topic: String,
    pub publish_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
}

/// Settings for the aggregate consumer process.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub database_url: String,
    pub kafka_brokers: String,
    pub ratings_topic: String,
    pub group_id: String,
    pub course_service_url: String,
    pub catalog_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            port: try_load(&lookup, "PORT", "8083")?,
            identity_url: format!(
                "{}/api/users",
                try_load::<String, _>(&lookup, "USER_SERVICE_URL", "http://user-service:8081")?
                    .trim_end_matches('/')
            ),
            identity_timeout: Duration::from_millis(try_load(
                &lookup,
                "IDENTITY_TIMEOUT_MS",
                "3000",
            )?),
            kafka_brokers: try_load(&lookup, "KAFKA_BROKERS", "localhost:9092")?,
            ratings_topic: try_load(&lookup, "RATINGS_TOPIC", "ratings")?,
            publish_timeout: Duration::from_millis(try_load(
                &lookup,
                "KAFKA_PUBLISH_TIMEOUT_MS",
                "5000",
            )?),
            allowed_origins: try_load::<String, _>(&lookup, "ALLOWED_ORIGINS", "http://localhost:3000")?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_per_minute: try_load(&lookup, "RATE_LIMIT_PER_MINUTE", "1000")?,
        })
    }
}

impl AggregatorConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            kafka_brokers: try_load(&lookup, "KAFKA_BROKERS", "localhost:9092")?,
            ratings_topic: try_load(&lookup, "RATINGS_TOPIC", "ratings")?,
            group_id: try_load(&lookup, "KAFKA_GROUP_ID", "course-rating-aggregator")?,
            course_service_url: try_load(
                &lookup,
                "COURSE_SERVICE_URL",
                "http://course-service:8082",
            )?,
            catalog_timeout: Duration::from_millis(try_load(
                &lookup,
                "CATALOG_TIMEOUT_MS",
                "5000",
            )?),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| AppError::EnvError(format!("{key} must be set")))
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| AppError::EnvError(format!("Invalid {key} value: {e}")))
}
