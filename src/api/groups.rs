//! Group endpoints

use crate::api::ExtractUser;
use crate::api::groups::schemas::{CreateGroup, GroupList};
use crate::api::messages::schemas::{Message, MessagesList};
use crate::core::errors::ContentError;
use crate::core::traits::{MessageService, SocialService};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:id/messages", get(group_messages))
}

async fn list_groups(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<GroupList>, ContentError> {
    let groups = social_service.list_groups(current_user).await?;

    Ok(Json(GroupList {
        groups: groups.into_iter().map(schemas::Group::from).collect(),
    }))
}

async fn create_group(
    Inject(social_service): Inject<dyn SocialService>,
    ExtractUser(current_user): ExtractUser,
    Json(request): Json<CreateGroup>,
) -> Result<(StatusCode, Json<schemas::Group>), ContentError> {
    let group = social_service
        .create_group(current_user, request.name, request.member_ids)
        .await?;

    Ok((StatusCode::CREATED, Json(group.into())))
}

async fn group_messages(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<MessagesList>, ContentError> {
    let messages = message_service
        .get_group_messages(current_user, group_id)
        .await?;

    Ok(Json(MessagesList {
        messages: messages.into_iter().map(Message::from).collect(),
    }))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateGroup {
        pub name: String,
        #[serde(default)]
        pub member_ids: Vec<Uuid>,
    }

    #[derive(Serialize, Debug)]
    pub struct Group {
        pub id: Uuid,
        pub name: String,
        pub owner_id: Uuid,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Group> for Group {
        fn from(group: entities::Group) -> Self {
            Group {
                id: group.id,
                name: group.name,
                owner_id: group.owner_id,
                created_at: group.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct GroupList {
        pub groups: Vec<Group>,
    }
}
