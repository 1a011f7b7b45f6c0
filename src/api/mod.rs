use crate::core::errors::{ContentError, ObjectStoreError};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::error;
use std::str::FromStr;
use uuid::Uuid;

pub mod conversations;
pub mod events;
pub mod friends;
pub mod groups;
pub mod media;
pub mod messages;
pub mod stories;

/// Set by the identity provider in front of this service.
const X_USER_ID: &str = "X-User-ID";

#[derive(Debug)]
pub struct ExtractUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        if let Some(user_id) = parts.headers.get(X_USER_ID) {
            let user_id = user_id
                .to_str()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid user id"))?;
            match Uuid::from_str(user_id.trim()) {
                Ok(user_id) if !user_id.is_nil() => Ok(ExtractUser(user_id)),
                _ => Err((StatusCode::BAD_REQUEST, "invalid user id")),
            }
        } else {
            Err((StatusCode::BAD_REQUEST, "`X-User-ID` header is missing"))
        }
    }
}

/// Every endpoint of the service. The caller attaches the DI provider.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/messages", messages::router())
        .nest("/conversations", conversations::router())
        .nest("/groups", groups::router())
        .nest("/friends", friends::router())
        .nest("/stories", stories::router())
        .nest("/events", events::router())
        .nest("/media", media::router())
}

async fn health_check() -> &'static str {
    "OK"
}

impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        let status = match &self {
            ContentError::InvalidTarget
            | ContentError::EmptyContent
            | ContentError::InvalidTtl
            | ContentError::NotViewOnce => StatusCode::BAD_REQUEST,
            ContentError::NotAuthorized => StatusCode::FORBIDDEN,
            ContentError::NotFound => StatusCode::NOT_FOUND,
            ContentError::AlreadyViewed => StatusCode::CONFLICT,
            ContentError::Storage(e) => {
                error!("{e}");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
                "retryable": self.is_retryable(),
            })),
        )
            .into_response()
    }
}

impl IntoResponse for ObjectStoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            ObjectStoreError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ObjectStoreError::Empty => StatusCode::BAD_REQUEST,
            ObjectStoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ObjectStoreError::Io(e) => {
                error!("{e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
