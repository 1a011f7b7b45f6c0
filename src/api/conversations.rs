//! Conversations endpoints

use crate::api::ExtractUser;
use crate::api::conversations::schemas::ConversationList;
use crate::core::errors::ContentError;
use crate::core::traits::MessageService;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/", get(list_conversations))
}

async fn list_conversations(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<ConversationList>, ContentError> {
    let conversations = message_service.get_conversations(current_user).await?;

    Ok(Json(ConversationList {
        conversations: conversations
            .into_iter()
            .map(schemas::Conversation::from)
            .collect(),
    }))
}

pub mod schemas {
    use crate::api::messages::schemas::Message;
    use crate::core::models;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    pub struct Conversation {
        pub friend_id: Uuid,
        pub last_message: Message,
        pub unread_count: u32,
        pub last_activity: DateTime<Utc>,
    }

    impl From<models::Conversation> for Conversation {
        fn from(conversation: models::Conversation) -> Self {
            Conversation {
                friend_id: conversation.friend_id,
                last_message: conversation.last_message.into(),
                unread_count: conversation.unread_count,
                last_activity: conversation.last_activity,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationList {
        pub conversations: Vec<Conversation>,
    }
}
