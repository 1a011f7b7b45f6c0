//! Message endpoints

use crate::api::ExtractUser;
use crate::api::messages::schemas::{MessagesList, OpenedMessage, ReadReceipt, SendMessage};
use crate::core::errors::ContentError;
use crate::core::models::NewMessage;
use crate::core::traits::MessageService;
use crate::infrastructure::entities::Target;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", post(send_message))
        .route("/with/:user_id", get(messages_with))
        .route("/:id/read", post(mark_read))
        .route("/:id/open", post(open_message))
        .route("/:id", delete(delete_message))
}

async fn send_message(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    Json(request): Json<SendMessage>,
) -> Result<(StatusCode, Json<schemas::Message>), ContentError> {
    let target = match (request.recipient_id, request.group_id) {
        (Some(user_id), None) => Target::User(user_id),
        (None, Some(group_id)) => Target::Group(group_id),
        _ => return Err(ContentError::InvalidTarget),
    };

    let message = message_service
        .send_message(
            current_user,
            NewMessage {
                target,
                content: request.content,
                media: request.media.map(Into::into),
                ttl_hours: request.ttl_hours,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(message.into())))
}

async fn messages_with(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    Path(other_user): Path<Uuid>,
) -> Result<Json<MessagesList>, ContentError> {
    let messages = message_service
        .get_messages_with(current_user, other_user)
        .await?;

    Ok(Json(MessagesList {
        messages: messages.into_iter().map(schemas::Message::from).collect(),
    }))
}

async fn mark_read(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<ReadReceipt>, ContentError> {
    let changed = message_service.mark_read(message_id, current_user).await?;

    Ok(Json(ReadReceipt {
        message_id,
        changed,
    }))
}

async fn open_message(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<OpenedMessage>, ContentError> {
    let message = message_service
        .mark_first_viewed(message_id, current_user)
        .await?;

    OpenedMessage::try_from(message)
        .map(Json)
        .map_err(|_| ContentError::NotViewOnce)
}

async fn delete_message(
    Inject(message_service): Inject<dyn MessageService>,
    ExtractUser(current_user): ExtractUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ContentError> {
    message_service
        .delete_message(message_id, current_user)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum MediaKind {
        Image,
        Video,
    }

    impl From<entities::MediaKind> for MediaKind {
        fn from(kind: entities::MediaKind) -> Self {
            match kind {
                entities::MediaKind::Image => MediaKind::Image,
                entities::MediaKind::Video => MediaKind::Video,
            }
        }
    }

    impl From<MediaKind> for entities::MediaKind {
        fn from(kind: MediaKind) -> Self {
            match kind {
                MediaKind::Image => entities::MediaKind::Image,
                MediaKind::Video => entities::MediaKind::Video,
            }
        }
    }

    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct Media {
        pub url: String,
        pub kind: MediaKind,
    }

    impl From<entities::MediaRef> for Media {
        fn from(media: entities::MediaRef) -> Self {
            Media {
                url: media.url,
                kind: media.kind.into(),
            }
        }
    }

    impl From<Media> for entities::MediaRef {
        fn from(media: Media) -> Self {
            entities::MediaRef {
                url: media.url,
                kind: media.kind.into(),
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct SendMessage {
        pub recipient_id: Option<Uuid>,
        pub group_id: Option<Uuid>,
        pub content: Option<String>,
        pub media: Option<Media>,
        pub ttl_hours: Option<u32>,
    }

    #[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum MessageKind {
        Text,
        Image,
        Video,
    }

    impl From<entities::MessageKind> for MessageKind {
        fn from(kind: entities::MessageKind) -> Self {
            match kind {
                entities::MessageKind::Text => MessageKind::Text,
                entities::MessageKind::Image => MessageKind::Image,
                entities::MessageKind::Video => MessageKind::Video,
            }
        }
    }

    /// A message as listed. Media is only included while it is unopened.
    #[derive(Serialize, Debug)]
    pub struct Message {
        pub id: Uuid,
        pub sender_id: Uuid,
        pub recipient_id: Option<Uuid>,
        pub group_id: Option<Uuid>,
        pub kind: MessageKind,
        pub content: Option<String>,
        pub media: Option<Media>,
        pub opened: bool,
        pub created_at: DateTime<Utc>,
        pub expires_at: Option<DateTime<Utc>>,
        pub read_at: Option<DateTime<Utc>>,
        pub first_viewed_at: Option<DateTime<Utc>>,
    }

    impl From<entities::Message> for Message {
        fn from(message: entities::Message) -> Self {
            let opened = message.first_viewed_at.is_some();
            Message {
                id: message.id,
                sender_id: message.sender_id,
                recipient_id: message.target.recipient_id(),
                group_id: message.target.group_id(),
                kind: message.kind().into(),
                content: message.content,
                media: message.media.filter(|_| !opened).map(Media::from),
                opened,
                created_at: message.created_at,
                expires_at: message.expires_at,
                read_at: message.read_at,
                first_viewed_at: message.first_viewed_at,
            }
        }
    }

    #[derive(Serialize, Debug, Default)]
    pub struct MessagesList {
        pub messages: Vec<Message>,
    }

    #[derive(Serialize, Debug)]
    pub struct ReadReceipt {
        pub message_id: Uuid,
        pub changed: bool,
    }

    /// The single response that carries view-once media after it is opened.
    #[derive(Serialize, Debug)]
    pub struct OpenedMessage {
        pub id: Uuid,
        pub media: Media,
        pub opened_at: DateTime<Utc>,
    }

    impl TryFrom<entities::Message> for OpenedMessage {
        type Error = entities::Message;

        fn try_from(message: entities::Message) -> Result<Self, Self::Error> {
            match (message.media.clone(), message.first_viewed_at) {
                (Some(media), Some(opened_at)) => Ok(OpenedMessage {
                    id: message.id,
                    media: media.into(),
                    opened_at,
                }),
                _ => Err(message),
            }
        }
    }
}
