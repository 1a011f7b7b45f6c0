//! Story endpoints

use crate::api::ExtractUser;
use crate::api::stories::schemas::{
    CreateStory, FriendStoriesList, StoryList, ViewOutcome, ViewerList,
};
use crate::core::errors::ContentError;
use crate::core::models::NewStory;
use crate::core::traits::StoryService;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(friends_stories).post(create_story))
        .route("/mine", get(own_stories))
        .route("/:id/view", post(view_story))
        .route("/:id/viewers", get(story_viewers))
        .route("/:id", delete(delete_story))
}

async fn create_story(
    Inject(story_service): Inject<dyn StoryService>,
    ExtractUser(current_user): ExtractUser,
    Json(request): Json<CreateStory>,
) -> Result<(StatusCode, Json<schemas::Story>), ContentError> {
    let story = story_service
        .create_story(
            current_user,
            NewStory {
                media: request.media.into(),
                caption: request.caption,
                ttl_hours: request.ttl_hours,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(story.into())))
}

async fn friends_stories(
    Inject(story_service): Inject<dyn StoryService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<FriendStoriesList>, ContentError> {
    let friends = story_service.get_friends_stories(current_user).await?;

    Ok(Json(FriendStoriesList {
        friends: friends
            .into_iter()
            .map(schemas::FriendStories::from)
            .collect(),
    }))
}

async fn own_stories(
    Inject(story_service): Inject<dyn StoryService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<StoryList>, ContentError> {
    let stories = story_service.get_own_stories(current_user).await?;

    Ok(Json(StoryList {
        stories: stories.into_iter().map(schemas::Story::from).collect(),
    }))
}

async fn view_story(
    Inject(story_service): Inject<dyn StoryService>,
    ExtractUser(current_user): ExtractUser,
    Path(story_id): Path<Uuid>,
) -> Result<Json<ViewOutcome>, ContentError> {
    let first_view = story_service.view_story(story_id, current_user).await?;

    Ok(Json(ViewOutcome {
        story_id,
        first_view,
    }))
}

async fn story_viewers(
    Inject(story_service): Inject<dyn StoryService>,
    ExtractUser(current_user): ExtractUser,
    Path(story_id): Path<Uuid>,
) -> Result<Json<ViewerList>, ContentError> {
    let viewers = story_service
        .get_story_viewers(story_id, current_user)
        .await?;

    Ok(Json(ViewerList {
        viewers: viewers.into_iter().map(schemas::Viewer::from).collect(),
    }))
}

async fn delete_story(
    Inject(story_service): Inject<dyn StoryService>,
    ExtractUser(current_user): ExtractUser,
    Path(story_id): Path<Uuid>,
) -> Result<StatusCode, ContentError> {
    story_service.delete_story(story_id, current_user).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub mod schemas {
    use crate::api::messages::schemas::Media;
    use crate::core::models;
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateStory {
        pub media: Media,
        pub caption: Option<String>,
        pub ttl_hours: Option<u32>,
    }

    #[derive(Serialize, Debug)]
    pub struct Story {
        pub id: Uuid,
        pub owner_id: Uuid,
        pub media: Media,
        pub caption: Option<String>,
        pub created_at: DateTime<Utc>,
        pub expires_at: DateTime<Utc>,
        pub view_count: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub viewed: Option<bool>,
    }

    impl From<entities::Story> for Story {
        fn from(story: entities::Story) -> Self {
            Story {
                id: story.id,
                owner_id: story.owner_id,
                media: story.media.into(),
                caption: story.caption,
                created_at: story.created_at,
                expires_at: story.expires_at,
                view_count: story.view_count,
                viewed: None,
            }
        }
    }

    impl From<entities::ViewerStory> for Story {
        fn from(viewer_story: entities::ViewerStory) -> Self {
            Story {
                viewed: Some(viewer_story.viewed),
                ..Story::from(viewer_story.story)
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct StoryList {
        pub stories: Vec<Story>,
    }

    #[derive(Serialize, Debug)]
    pub struct FriendStories {
        pub owner_id: Uuid,
        pub stories: Vec<Story>,
        pub has_new_stories: bool,
        pub latest_story_at: DateTime<Utc>,
    }

    impl From<models::FriendStories> for FriendStories {
        fn from(friend: models::FriendStories) -> Self {
            FriendStories {
                owner_id: friend.owner_id,
                stories: friend.stories.into_iter().map(Story::from).collect(),
                has_new_stories: friend.has_new_stories,
                latest_story_at: friend.latest_story_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct FriendStoriesList {
        pub friends: Vec<FriendStories>,
    }

    #[derive(Serialize, Debug)]
    pub struct ViewOutcome {
        pub story_id: Uuid,
        pub first_view: bool,
    }

    #[derive(Serialize, Debug)]
    pub struct Viewer {
        pub viewer_id: Uuid,
        pub viewed_at: DateTime<Utc>,
    }

    impl From<entities::StoryView> for Viewer {
        fn from(view: entities::StoryView) -> Self {
            Viewer {
                viewer_id: view.viewer_id,
                viewed_at: view.viewed_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ViewerList {
        pub viewers: Vec<Viewer>,
    }
}
