pub mod rating;
pub mod rating_event;
pub mod stats;

pub use rating::{NewRating, Rating};
pub use rating_event::{RatingEvent, RatingEventType};
pub use stats::{CourseRatingStats, CourseTotals};
