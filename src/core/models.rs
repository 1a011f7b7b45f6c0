//! Domain types that are computed or exchanged but never stored as-is.

use crate::infrastructure::entities::{MediaRef, Message, Target, ViewerStory};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Input of `send_message`. The sender is always the authenticated caller.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub target: Target,
    pub content: Option<String>,
    pub media: Option<MediaRef>,
    /// Media defaults to 24 hours, text to no expiry.
    pub ttl_hours: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewStory {
    pub media: MediaRef,
    pub caption: Option<String>,
    /// Overrides the default 24 hour lifetime.
    pub ttl_hours: Option<u32>,
}

/// Derived, per (current user, friend) pair. Recomputed on every read.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub friend_id: Uuid,
    pub last_message: Message,
    pub unread_count: u32,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FriendStories {
    pub owner_id: Uuid,
    /// Oldest first.
    pub stories: Vec<ViewerStory>,
    pub has_new_stories: bool,
    pub latest_story_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub messages: u64,
    pub stories: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.messages + self.stories
    }
}

/// Published to the change notifier after a mutation. Payloads only carry
/// ids, consumers re-read the source rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub target_user_id: Uuid,
    #[serde(flatten)]
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Change {
    MessageCreated {
        message_id: Uuid,
        sender_id: Uuid,
        group_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    },
    MessageRead {
        message_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    },
    MessageOpened {
        message_id: Uuid,
        viewer_id: Uuid,
        opened_at: DateTime<Utc>,
    },
    MessageDeleted {
        message_id: Uuid,
    },
    StoryCreated {
        story_id: Uuid,
        owner_id: Uuid,
        created_at: DateTime<Utc>,
    },
    StoryViewed {
        story_id: Uuid,
        viewer_id: Uuid,
    },
}

impl Change {
    pub fn name(&self) -> &'static str {
        match self {
            Change::MessageCreated { .. } => "message_created",
            Change::MessageRead { .. } => "message_read",
            Change::MessageOpened { .. } => "message_opened",
            Change::MessageDeleted { .. } => "message_deleted",
            Change::StoryCreated { .. } => "story_created",
            Change::StoryViewed { .. } => "story_viewed",
        }
    }

    pub fn to(self, target_user_id: Uuid) -> ChangeEvent {
        ChangeEvent {
            target_user_id,
            change: self,
        }
    }
}
