use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Exact integer totals for one course, straight from the rating store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromRow)]
pub struct CourseTotals {
    pub sum: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRatingStats {
    pub course_id: i64,
    pub average_rating: Option<f64>,
    pub total_ratings: i64,
}

impl CourseRatingStats {
    pub fn from_totals(course_id: i64, totals: CourseTotals) -> Self {
        Self {
            course_id,
            average_rating: average_tenths(totals).map(|tenths| tenths as f64 / 10.0),
            total_ratings: totals.count,
        }
    }
}

/// Average in tenths, rounded half-up, computed without floating point.
/// Scores are never negative, so integer division floors toward the right
/// value.
pub fn average_tenths(totals: CourseTotals) -> Option<i64> {
    if totals.count <= 0 {
        return None;
    }
    Some((totals.sum * 20 + totals.count) / (totals.count * 2))
}
