//! Caller identity tests
//!
//! Every request names its caller with the `X-User-ID` header set by the
//! identity provider. Anything else claiming to be the caller is ignored.

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::{HeaderValue, Request, StatusCode, header};
use di_axum::RouterServiceProviderExtensions;
use ephemeral_content_api::api::{self, ExtractUser};
use ephemeral_content_api::infrastructure::database::DatabaseConnection;
use ephemeral_content_api::service_collection;
use serde_json::{Value, json};
use serial_test::serial;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

async fn extract(name: &str, value: HeaderValue) -> Result<ExtractUser, (StatusCode, &'static str)> {
    let mut req = Request::builder().body(()).unwrap();
    req.headers_mut().insert(
        axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
        value,
    );

    let (mut parts, _) = req.into_parts();
    ExtractUser::from_request_parts(&mut parts, &()).await
}

#[tokio::test]
async fn test_caller_is_read_from_header() {
    let user_id = Uuid::new_v4();

    let caller = extract("X-User-ID", HeaderValue::from_str(&user_id.to_string()).unwrap())
        .await
        .unwrap();

    assert_eq!(caller.0, user_id);
}

#[tokio::test]
async fn test_header_name_is_case_insensitive() {
    let user_id = Uuid::new_v4();

    for name in ["x-user-id", "X-USER-ID"] {
        let caller = extract(name, HeaderValue::from_str(&user_id.to_string()).unwrap())
            .await
            .unwrap();
        assert_eq!(caller.0, user_id);
    }
}

#[tokio::test]
async fn test_surrounding_whitespace_is_ignored() {
    let user_id = Uuid::new_v4();
    let padded = HeaderValue::from_str(&format!("  {user_id}\t")).unwrap();

    let caller = extract("X-User-ID", padded).await.unwrap();

    assert_eq!(caller.0, user_id);
}

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

    let (status, message) = ExtractUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("missing"));
}

#[tokio::test]
async fn test_nil_and_malformed_ids_are_rejected() {
    let values = [
        HeaderValue::from_str(&Uuid::nil().to_string()).unwrap(),
        HeaderValue::from_static("not-a-uuid"),
        HeaderValue::from_static(""),
        HeaderValue::from_bytes(&[0xFF, 0xFE]).unwrap(),
    ];

    for value in values {
        let (status, message) = extract("X-User-ID", value).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "invalid user id");
    }
}

async fn send(user: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-User-ID", user);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let provider = service_collection().build_provider().unwrap();
    let response = api::router()
        .with_provider(provider)
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
#[serial]
async fn test_sender_in_body_is_ignored() {
    let pool = SqlitePool::connect("sqlite:file:authtestdb?mode=memory&cache=shared")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    DatabaseConnection::set_test_pool(pool.clone());

    let (alice, bob, mallory) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let (status, _) = send(&alice.to_string(), &format!("/friends/{bob}/request"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&bob.to_string(), &format!("/friends/{alice}/accept"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, sent) = send(
        &format!(" {alice} "),
        "/messages",
        Some(json!({ "sender_id": mallory, "recipient_id": bob, "content": "it's me" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["sender_id"], json!(alice));

    let (status, _) = send(
        &Uuid::nil().to_string(),
        "/messages",
        Some(json!({ "sender_id": alice, "recipient_id": bob, "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    DatabaseConnection::clear_test_pool();
}
