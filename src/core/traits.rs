//! DI "Interfaces"

use crate::core::errors::{ContentError, ObjectStoreError};
use crate::core::models::{ChangeEvent, Conversation, FriendStories, NewMessage, NewStory, SweepReport};
use crate::infrastructure::entities;
use crate::infrastructure::entities::{FriendshipStatus, MediaRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use uuid::Uuid;

pub type ContentResult<T> = Result<T, ContentError>;

/// Source of "now" for every expiry decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Publish/subscribe channel keyed by user id.
///
/// Delivery is fire-and-forget; subscribers must tolerate duplicates and
/// gaps by re-reading state from the services.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: ChangeEvent);

    /// Stream of the events addressed to `user_id`, starting now.
    fn subscribe(&self, user_id: Uuid) -> BoxStream<'static, ChangeEvent>;
}

/// Durable storage for media bytes. The core only ever keeps the URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bytes: &[u8], content_type: &str) -> Result<MediaRef, ObjectStoreError>;
}

#[async_trait]
pub trait MessageService: Send + Sync {
    /// Sends a message from `sender_id`.
    ///
    /// Returns `InvalidTarget` when addressing oneself, a user who is not a
    /// mutual friend, or a group the sender is not a member of, and
    /// `EmptyContent` when there is neither text nor media.
    async fn send_message(
        &self,
        sender_id: Uuid,
        message: NewMessage,
    ) -> ContentResult<entities::Message>;

    /// Direct messages between the two users, oldest first, without the
    /// expired ones. Does not change read state.
    async fn get_messages_with(
        &self,
        current_user_id: Uuid,
        other_user_id: Uuid,
    ) -> ContentResult<Vec<entities::Message>>;

    /// Messages of a group the caller belongs to, with the caller's read state.
    ///
    /// Returns `NotAuthorized` for non-members.
    async fn get_group_messages(
        &self,
        current_user_id: Uuid,
        group_id: Uuid,
    ) -> ContentResult<Vec<entities::Message>>;

    /// Sets `read_at` for the caller. Returns whether this call changed it;
    /// marking an already read message is a no-op.
    ///
    /// Returns `NotAuthorized` if the caller is not a recipient (the sender
    /// never is), `NotFound` if the message is missing or expired.
    async fn mark_read(&self, message_id: Uuid, caller_id: Uuid) -> ContentResult<bool>;

    /// The view-once transition for media messages. Exactly one caller ever
    /// succeeds and gets the opened message back, every later call gets
    /// `AlreadyViewed`.
    async fn mark_first_viewed(
        &self,
        message_id: Uuid,
        caller_id: Uuid,
    ) -> ContentResult<entities::Message>;

    /// Hard-deletes a message. Direct messages may be deleted by either
    /// participant, group messages by their sender.
    async fn delete_message(&self, message_id: Uuid, caller_id: Uuid) -> ContentResult<()>;

    /// One entry per direct-message counterpart, most recent activity first.
    async fn get_conversations(&self, current_user_id: Uuid) -> ContentResult<Vec<Conversation>>;
}

#[async_trait]
pub trait StoryService: Send + Sync {
    async fn create_story(&self, owner_id: Uuid, story: NewStory) -> ContentResult<entities::Story>;

    /// Stories of every mutual friend, friends with unseen stories first.
    async fn get_friends_stories(&self, viewer_id: Uuid) -> ContentResult<Vec<FriendStories>>;

    async fn get_own_stories(&self, owner_id: Uuid) -> ContentResult<Vec<entities::Story>>;

    /// Counts the viewer once per story. Returns whether this call was the
    /// first view. Owners looking at their own story are not counted.
    async fn view_story(&self, story_id: Uuid, viewer_id: Uuid) -> ContentResult<bool>;

    /// Returns `NotAuthorized` unless the caller owns the story.
    async fn get_story_viewers(
        &self,
        story_id: Uuid,
        caller_id: Uuid,
    ) -> ContentResult<Vec<entities::StoryView>>;

    async fn delete_story(&self, story_id: Uuid, caller_id: Uuid) -> ContentResult<()>;
}

#[async_trait]
pub trait SocialService: Send + Sync {
    /// Returns the resulting status of the caller's edge: `Pending`, or
    /// `Accepted` when the target had already asked the caller.
    async fn send_friend_request(
        &self,
        caller_id: Uuid,
        target_id: Uuid,
    ) -> ContentResult<FriendshipStatus>;

    async fn accept_friend_request(&self, caller_id: Uuid, requester_id: Uuid)
    -> ContentResult<()>;

    async fn reject_friend_request(&self, caller_id: Uuid, requester_id: Uuid)
    -> ContentResult<()>;

    async fn remove_friend(&self, caller_id: Uuid, friend_id: Uuid) -> ContentResult<()>;

    async fn block_user(&self, caller_id: Uuid, target_id: Uuid) -> ContentResult<()>;

    async fn list_friends(&self, caller_id: Uuid) -> ContentResult<Vec<Uuid>>;

    async fn list_pending_requests(
        &self,
        caller_id: Uuid,
    ) -> ContentResult<Vec<entities::Friendship>>;

    /// Every member must be a mutual friend of the owner.
    async fn create_group(
        &self,
        owner_id: Uuid,
        name: String,
        member_ids: Vec<Uuid>,
    ) -> ContentResult<entities::Group>;

    async fn list_groups(&self, caller_id: Uuid) -> ContentResult<Vec<entities::Group>>;
}

#[async_trait]
pub trait SweepService: Send + Sync {
    /// Deletes everything that expired before `now`. Safe to run repeatedly
    /// and concurrently.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> ContentResult<SweepReport>;
}
