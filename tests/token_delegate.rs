use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use course_ratings::auth::{Authenticator, TokenDelegate, Unauthenticated};
use serde_json::json;

async fn validate(headers: HeaderMap) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();

    match token.as_str() {
        "good" => Json(json!({ "valid": true, "subjectId": 7 })).into_response(),
        "legacy" => Json(json!({ "valid": true, "userId": 9 })).into_response(),
        "anonymous" => Json(json!({ "valid": true })).into_response(),
        "garbled" => "definitely not json".into_response(),
        "boom" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "valid": true, "subjectId": 7 })).into_response()
        }
        _ => Json(json!({ "valid": false })).into_response(),
    }
}

/// Starts a stand-in identity authority and returns its base url.
async fn spawn_authority() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/api/users/validate", get(validate));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/api/users")
}

async fn delegate() -> TokenDelegate {
    let url = spawn_authority().await;
    TokenDelegate::new(&url, Duration::from_millis(300)).unwrap()
}

#[tokio::test]
async fn valid_token_resolves_subject() {
    let delegate = delegate().await;

    assert_eq!(delegate.authenticate("Bearer good").await, Ok(7));
    assert_eq!(delegate.authenticate("good").await, Ok(7));
    assert_eq!(delegate.authenticate("Bearer legacy").await, Ok(9));
}

#[tokio::test]
async fn empty_token_is_unauthenticated() {
    let delegate = delegate().await;

    assert_eq!(delegate.authenticate("").await, Err(Unauthenticated));
    assert_eq!(delegate.authenticate("Bearer ").await, Err(Unauthenticated));
}

#[tokio::test]
async fn timeout_is_unauthenticated() {
    let delegate = delegate().await;

    let started = std::time::Instant::now();
    assert_eq!(delegate.authenticate("Bearer slow").await, Err(Unauthenticated));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn rejected_token_is_unauthenticated() {
    let delegate = delegate().await;

    assert_eq!(delegate.authenticate("Bearer revoked").await, Err(Unauthenticated));
}

#[tokio::test]
async fn malformed_body_is_unauthenticated() {
    let delegate = delegate().await;

    assert_eq!(delegate.authenticate("Bearer garbled").await, Err(Unauthenticated));
}

#[tokio::test]
async fn missing_subject_is_unauthenticated() {
    let delegate = delegate().await;

    assert_eq!(delegate.authenticate("Bearer anonymous").await, Err(Unauthenticated));
}

#[tokio::test]
async fn error_status_is_unauthenticated() {
    let delegate = delegate().await;

    assert_eq!(delegate.authenticate("Bearer boom").await, Err(Unauthenticated));
}

#[tokio::test]
async fn unreachable_authority_is_unauthenticated() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let delegate = TokenDelegate::new(&format!("http://{addr}"), Duration::from_millis(300)).unwrap();

    assert_eq!(delegate.authenticate("Bearer good").await, Err(Unauthenticated));
}
