//! Friendship endpoints

use crate::api::ExtractUser;
use crate::api::friends::schemas::{FriendList, PendingList, RequestOutcome};
use crate::core::errors::ContentError;
use crate::core::traits::SocialService;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_friends))
        .route("/pending", get(list_pending))
        .route("/:id/request", post(send_request))
        .route("/:id/accept", post(accept_request))
        .route("/:id/reject", post(reject_request))
        .route("/:id/block", post(block_user))
        .route("/:id", delete(remove_friend))
}

async fn list_friends(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<FriendList>, ContentError> {
    let friends = social_service.list_friends(current_user).await?;

    Ok(Json(FriendList { friends }))
}

async fn list_pending(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<PendingList>, ContentError> {
    let requests = social_service.list_pending_requests(current_user).await?;

    Ok(Json(PendingList {
        requests: requests
            .into_iter()
            .map(schemas::PendingRequest::from)
            .collect(),
    }))
}

async fn send_request(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
    Path(target): Path<Uuid>,
) -> Result<Json<RequestOutcome>, ContentError> {
    let status = social_service
        .send_friend_request(current_user, target)
        .await?;

    Ok(Json(RequestOutcome {
        status: status.into(),
    }))
}

async fn accept_request(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
    Path(requester): Path<Uuid>,
) -> Result<StatusCode, ContentError> {
    social_service
        .accept_friend_request(current_user, requester)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn reject_request(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
    Path(requester): Path<Uuid>,
) -> Result<StatusCode, ContentError> {
    social_service
        .reject_friend_request(current_user, requester)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn block_user(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
    Path(target): Path<Uuid>,
) -> Result<StatusCode, ContentError> {
    social_service.block_user(current_user, target).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn remove_friend(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
    Path(friend): Path<Uuid>,
) -> Result<StatusCode, ContentError> {
    social_service.remove_friend(current_user, friend).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    pub struct FriendList {
        pub friends: Vec<Uuid>,
    }

    #[derive(Serialize, Debug)]
    pub struct PendingRequest {
        pub user_id: Uuid,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Friendship> for PendingRequest {
        fn from(friendship: entities::Friendship) -> Self {
            PendingRequest {
                user_id: friendship.user_id,
                created_at: friendship.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct PendingList {
        pub requests: Vec<PendingRequest>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "snake_case")]
    pub enum FriendshipStatus {
        Pending,
        Accepted,
        Blocked,
    }

    impl From<entities::FriendshipStatus> for FriendshipStatus {
        fn from(status: entities::FriendshipStatus) -> Self {
            match status {
                entities::FriendshipStatus::Pending => FriendshipStatus::Pending,
                entities::FriendshipStatus::Accepted => FriendshipStatus::Accepted,
                entities::FriendshipStatus::Blocked => FriendshipStatus::Blocked,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct RequestOutcome {
        pub status: FriendshipStatus,
    }
}
