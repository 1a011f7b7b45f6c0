//! Media upload and download

use crate::api::ExtractUser;
use crate::api::messages::schemas::Media;
use crate::config::CONFIG;
use crate::core::errors::ObjectStoreError;
use crate::core::traits::ObjectStore;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::debug;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

pub fn router() -> Router {
    Router::new()
        .route("/", post(upload))
        .layer(DefaultBodyLimit::max(CONFIG.max_media_bytes))
        .nest_service(
            "/files",
            ServiceBuilder::new().service(ServeDir::new(&CONFIG.media_dir)),
        )
}

async fn upload(
    Inject(object_store): Inject<dyn ObjectStore>,
    ExtractUser(current_user): ExtractUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Media>), ObjectStoreError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let media = object_store.put(&body, content_type).await?;
    debug!("User {current_user} uploaded {}", media.url);

    Ok((StatusCode::CREATED, Json(media.into())))
}
