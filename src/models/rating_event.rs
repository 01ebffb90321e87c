use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Rating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RatingEventType {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for RatingEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RatingEventType::Created => "CREATED",
            RatingEventType::Updated => "UPDATED",
            RatingEventType::Deleted => "DELETED",
        };
        f.write_str(tag)
    }
}

/// Immutable record of one committed rating mutation, as carried on the
/// ratings topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEvent {
    pub event_type: RatingEventType,
    pub rating_id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub rating: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RatingEvent {
    /// Builds the event for a row that has already been written. The
    /// timestamp is taken now, not from the row.
    pub fn new(event_type: RatingEventType, rating: &Rating) -> Self {
        let review = match event_type {
            RatingEventType::Created | RatingEventType::Updated => rating.review.clone(),
            RatingEventType::Deleted => None,
        };

        Self {
            event_type,
            rating_id: rating.id,
            user_id: rating.user_id,
            course_id: rating.course_id,
            rating: rating.score,
            review,
            timestamp: Utc::now(),
        }
    }

    /// Ordering key: every event for one (user, course) pair lands on the
    /// same partition.
    pub fn partition_key(&self) -> String {
        format!("{}-{}", self.user_id, self.course_id)
    }
}
