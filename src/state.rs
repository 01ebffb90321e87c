use std::sync::Arc;

use crate::{auth::Authenticator, coordinator::RatingCoordinator};

#[derive(Clone)]
pub struct AppState {
    pub ratings: Arc<RatingCoordinator>,
    pub authenticator: Arc<dyn Authenticator>,
}
