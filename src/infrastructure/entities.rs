//! Database entities

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(u8)]
pub enum FriendshipStatus {
    Pending = 1,
    Accepted = 2,
    Blocked = 3,
}

/// One directed edge of the social graph.
#[derive(Debug, Clone, FromRow)]
pub struct Friendship {
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(u8)]
pub enum MediaKind {
    Image = 1,
    Video = 2,
}

impl MediaKind {
    /// Maps an upload content type (`image/png`, `video/mp4`, ...) to a media kind.
    pub fn from_content_type(content_type: &str) -> Option<MediaKind> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.split_once('/') {
            Some(("image", subtype)) if !subtype.is_empty() => Some(MediaKind::Image),
            Some(("video", subtype)) if !subtype.is_empty() => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A durable URL handed out by the object store, plus what it points at.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MediaRef {
    #[sqlx(rename = "media_url")]
    pub url: String,
    #[sqlx(rename = "media_kind")]
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    Video,
}

/// Who a message is addressed to. Stored as two nullable columns of which
/// exactly one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    User(Uuid),
    Group(Uuid),
}

impl Target {
    pub fn recipient_id(&self) -> Option<Uuid> {
        match self {
            Target::User(id) => Some(*id),
            Target::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            Target::User(_) => None,
            Target::Group(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub target: Target,
    pub content: Option<String>,
    pub media: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// For group messages this is the reading member's receipt, not a
    /// property of the message itself.
    pub read_at: Option<DateTime<Utc>>,
    pub first_viewed_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match &self.media {
            None => MessageKind::Text,
            Some(MediaRef {
                kind: MediaKind::Image,
                ..
            }) => MessageKind::Image,
            Some(MediaRef {
                kind: MediaKind::Video,
                ..
            }) => MessageKind::Video,
        }
    }

    /// Only media messages are gated by `first_viewed_at`.
    pub fn is_view_once(&self) -> bool {
        self.media.is_some()
    }

    /// The other side of a direct message as seen from `user_id`.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        match self.target {
            Target::User(recipient) if self.sender_id == user_id => Some(recipient),
            Target::User(recipient) if recipient == user_id => Some(self.sender_id),
            _ => None,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Message {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let recipient_id: Option<Uuid> = row.try_get("recipient_id")?;
        let group_id: Option<Uuid> = row.try_get("group_id")?;
        let target = match (recipient_id, group_id) {
            (Some(user), None) => Target::User(user),
            (None, Some(group)) => Target::Group(group),
            _ => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "recipient_id".to_owned(),
                    source: "exactly one of recipient_id and group_id must be set".into(),
                });
            }
        };

        let media_url: Option<String> = row.try_get("media_url")?;
        let media_kind: Option<MediaKind> = row.try_get("media_kind")?;
        let media = match (media_url, media_kind) {
            (Some(url), Some(kind)) => Some(MediaRef { url, kind }),
            (None, None) => None,
            _ => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "media_url".to_owned(),
                    source: "media_url and media_kind must be set together".into(),
                });
            }
        };

        Ok(Message {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            target,
            content: row.try_get("content")?,
            media,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            read_at: row.try_get("read_at")?,
            first_viewed_at: row.try_get("first_viewed_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Story {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[sqlx(flatten)]
    pub media: MediaRef,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub view_count: i64,
}

/// A story as returned to a particular viewer.
#[derive(Debug, Clone, FromRow)]
pub struct ViewerStory {
    #[sqlx(flatten)]
    pub story: Story,
    pub viewed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct StoryView {
    pub story_id: Uuid,
    pub viewer_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}
