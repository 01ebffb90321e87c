use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use course_ratings::{
    coordinator::RatingCoordinator,
    db::{MemoryRatingStore, RatingStore},
    errors::AppError,
    events::InMemoryPublisher,
    models::{CourseTotals, NewRating, Rating, RatingEventType},
};

fn setup() -> (Arc<MemoryRatingStore>, InMemoryPublisher, RatingCoordinator) {
    let store = Arc::new(MemoryRatingStore::new());
    let publisher = InMemoryPublisher::new();
    let coordinator = RatingCoordinator::new(store.clone(), Arc::new(publisher.clone()));
    (store, publisher, coordinator)
}

#[tokio::test]
async fn create_update_delete_scenario() {
    let (store, publisher, coordinator) = setup();

    let created = coordinator.upsert(7, 42, 4, None).await.unwrap();
    assert_eq!(created.score, 4);

    let updated = coordinator
        .upsert(7, 42, 5, Some("even better second time".into()))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.score, 5);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(store.find_by_user(7).await.unwrap().len(), 1);

    coordinator.delete(7, created.id).await.unwrap();
    assert!(
        store
            .find_by_user_and_course(7, 42)
            .await
            .unwrap()
            .is_none()
    );

    let events = publisher.events();
    let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            RatingEventType::Created,
            RatingEventType::Updated,
            RatingEventType::Deleted
        ]
    );

    assert_eq!((events[0].user_id, events[0].course_id, events[0].rating), (7, 42, 4));
    assert_eq!(events[1].rating, 5);
    assert_eq!(events[1].review.as_deref(), Some("even better second time"));
    assert_eq!(events[2].review, None);
    assert!(events.iter().all(|e| e.rating_id == created.id));
    assert!(events.iter().all(|e| e.partition_key() == "7-42"));
}

#[tokio::test]
async fn last_upsert_wins() {
    let (store, publisher, coordinator) = setup();

    for score in [3, 1, 5, 2] {
        coordinator.upsert(1, 9, score, None).await.unwrap();
    }

    let rows = store.find_by_course(9).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].score, 2);
    assert_eq!(publisher.events().len(), 4);
    assert_eq!(publisher.events()[0].event_type, RatingEventType::Created);
}

#[tokio::test]
async fn delete_by_non_owner_is_forbidden() {
    let (store, publisher, coordinator) = setup();
    let rating = coordinator.upsert(7, 42, 4, None).await.unwrap();

    let err = coordinator.delete(8, rating.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert_eq!(store.find_by_id(rating.id).await.unwrap(), Some(rating));
    assert_eq!(publisher.events().len(), 1);
}

#[tokio::test]
async fn delete_missing_rating_is_not_found() {
    let (_, publisher, coordinator) = setup();

    let err = coordinator.delete(7, 404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn invalid_score_touches_nothing() {
    let (store, publisher, coordinator) = setup();

    let err = coordinator.upsert(7, 42, 6, None).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(store.is_empty().await);
    assert!(publisher.events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_leave_one_row() {
    let (store, publisher, coordinator) = setup();
    let coordinator = Arc::new(coordinator);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.upsert(3, 5, 1 + i % 5, None).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.find_by_course(5).await.unwrap().len(), 1);

    let events = publisher.events_for_key("3-5");
    assert_eq!(events.len(), 20);
    let created = events
        .iter()
        .filter(|e| e.event_type == RatingEventType::Created)
        .count();
    assert_eq!(created, 1);
    assert_eq!(events[0].event_type, RatingEventType::Created);

    let last = store.find_by_user_and_course(3, 5).await.unwrap().unwrap();
    assert_eq!(last.score, events.last().unwrap().rating);
}

/// Simulates another process creating the row between our lookup and our
/// insert: the first lookup reports nothing even though a row exists.
struct StaleFirstRead {
    inner: MemoryRatingStore,
    stale: AtomicBool,
}

#[async_trait]
impl RatingStore for StaleFirstRead {
    async fn find_by_id(&self, id: i64) -> Result<Option<Rating>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Rating>, AppError> {
        self.inner.find_by_user(user_id).await
    }

    async fn find_by_course(&self, course_id: i64) -> Result<Vec<Rating>, AppError> {
        self.inner.find_by_course(course_id).await
    }

    async fn find_by_user_and_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Rating>, AppError> {
        if self.stale.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_user_and_course(user_id, course_id).await
    }

    async fn insert(&self, rating: NewRating) -> Result<Rating, AppError> {
        self.inner.insert(rating).await
    }

    async fn update(
        &self,
        id: i64,
        score: i32,
        review: Option<String>,
    ) -> Result<Option<Rating>, AppError> {
        self.inner.update(id, score, review).await
    }

    async fn delete(&self, id: i64) -> Result<Option<Rating>, AppError> {
        self.inner.delete(id).await
    }

    async fn course_totals(&self, course_id: i64) -> Result<CourseTotals, AppError> {
        self.inner.course_totals(course_id).await
    }
}

#[tokio::test]
async fn racing_create_is_retried_as_update() {
    let store = Arc::new(StaleFirstRead {
        inner: MemoryRatingStore::new(),
        stale: AtomicBool::new(false),
    });
    let existing = store
        .inner
        .insert(NewRating {
            user_id: 7,
            course_id: 42,
            score: 2,
            review: None,
        })
        .await
        .unwrap();
    store.stale.store(true, Ordering::SeqCst);

    let publisher = InMemoryPublisher::new();
    let coordinator = RatingCoordinator::new(store.clone(), Arc::new(publisher.clone()));

    let rating = coordinator.upsert(7, 42, 5, None).await.unwrap();

    assert_eq!(rating.id, existing.id);
    assert_eq!(rating.score, 5);
    assert_eq!(store.inner.len().await, 1);

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, RatingEventType::Updated);
}

/// Store whose writes always fail after the lookup succeeds.
struct BrokenWrites(MemoryRatingStore);

#[async_trait]
impl RatingStore for BrokenWrites {
    async fn find_by_id(&self, id: i64) -> Result<Option<Rating>, AppError> {
        self.0.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Rating>, AppError> {
        self.0.find_by_user(user_id).await
    }

    async fn find_by_course(&self, course_id: i64) -> Result<Vec<Rating>, AppError> {
        self.0.find_by_course(course_id).await
    }

    async fn find_by_user_and_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Rating>, AppError> {
        self.0.find_by_user_and_course(user_id, course_id).await
    }

    async fn insert(&self, _rating: NewRating) -> Result<Rating, AppError> {
        Err(AppError::DatabaseError("connection reset".into()))
    }

    async fn update(
        &self,
        _id: i64,
        _score: i32,
        _review: Option<String>,
    ) -> Result<Option<Rating>, AppError> {
        Err(AppError::DatabaseError("connection reset".into()))
    }

    async fn delete(&self, _id: i64) -> Result<Option<Rating>, AppError> {
        Err(AppError::DatabaseError("connection reset".into()))
    }

    async fn course_totals(&self, course_id: i64) -> Result<CourseTotals, AppError> {
        self.0.course_totals(course_id).await
    }
}

#[tokio::test]
async fn failed_store_write_emits_no_event() {
    let store = Arc::new(BrokenWrites(MemoryRatingStore::new()));
    let publisher = InMemoryPublisher::new();
    let coordinator = RatingCoordinator::new(store, Arc::new(publisher.clone()));

    let err = coordinator.upsert(7, 42, 4, None).await.unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
    assert!(publisher.events().is_empty());
}

#[tokio::test]
async fn course_stats_reflect_store() {
    let (_, _, coordinator) = setup();

    let empty = coordinator.course_stats(42).await.unwrap();
    assert_eq!(empty.average_rating, None);

    coordinator.upsert(1, 42, 4, None).await.unwrap();
    coordinator.upsert(2, 42, 5, None).await.unwrap();
    coordinator.upsert(3, 42, 5, None).await.unwrap();

    let stats = coordinator.course_stats(42).await.unwrap();
    assert_eq!(stats.total_ratings, 3);
    assert_eq!(stats.average_rating, Some(4.7));
}
