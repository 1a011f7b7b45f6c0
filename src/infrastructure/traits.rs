//! Infrastructure traits, used for DI on higher levels
//!
//! Every query that lists content takes `now` and leaves out rows whose
//! `expires_at` lies before it.

use crate::infrastructure::entities;
use crate::infrastructure::entities::FriendshipStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert_message(&self, message: &entities::Message) -> RepoResult<()>;

    /// Loads a message regardless of expiry. Read state is the one stored on
    /// the message row (direct messages).
    async fn find_message(&self, message_id: Uuid) -> RepoResult<Option<entities::Message>>;

    /// Direct messages exchanged between two users, oldest first.
    async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<entities::Message>>;

    /// All direct messages sent or received by a user, oldest first.
    async fn list_direct_messages_involving(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<entities::Message>>;

    /// Messages of a group, oldest first, with `member_id`'s read state.
    async fn list_group_messages(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<entities::Message>>;

    /// Sets `read_at` if the message is addressed to `recipient_id`, unread
    /// and not expired. Returns whether a row changed.
    async fn mark_direct_read(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Atomic update-where-null of `first_viewed_at` (and `read_at` when
    /// unset). Returns whether this call performed the transition.
    async fn mark_direct_first_viewed(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    async fn mark_group_read(
        &self,
        message_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    async fn mark_group_first_viewed(
        &self,
        message_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    async fn delete_message(&self, message_id: Uuid) -> RepoResult<bool>;

    /// Removes every message that expired before `now`.
    async fn delete_expired_messages(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

#[async_trait]
pub trait StoryRepository: Send + Sync {
    async fn insert_story(&self, story: &entities::Story) -> RepoResult<()>;

    async fn find_story(&self, story_id: Uuid) -> RepoResult<Option<entities::Story>>;

    async fn list_stories_by_owner(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<entities::Story>>;

    /// Stories of every mutual friend of `viewer_id`, each flagged with
    /// whether the viewer has already seen it.
    async fn list_friend_stories(
        &self,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<entities::ViewerStory>>;

    /// Inserts the (story, viewer) view row and bumps `view_count` in one
    /// transaction. Returns `false` when the viewer had already been counted
    /// or the story is gone or expired.
    async fn record_view(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    async fn list_views(&self, story_id: Uuid) -> RepoResult<Vec<entities::StoryView>>;

    async fn delete_story(&self, story_id: Uuid) -> RepoResult<bool>;

    /// Removes every story (and its views) that expired before `now`.
    async fn delete_expired_stories(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

#[async_trait]
pub trait SocialGraphRepository: Send + Sync {
    async fn find_edge(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
    ) -> RepoResult<Option<entities::Friendship>>;

    /// Inserts a pending `user_id -> friend_id` edge unless one exists.
    async fn insert_pending(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Turns the pending `requester_id -> accepter_id` edge into an accepted
    /// one and writes the accepted reverse edge. Returns `false` when there
    /// was no pending request.
    async fn accept_pending(
        &self,
        requester_id: Uuid,
        accepter_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    async fn delete_edge(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
        status: FriendshipStatus,
    ) -> RepoResult<bool>;

    /// Deletes the edges in both directions.
    async fn delete_pair(&self, user_id: Uuid, other_user_id: Uuid) -> RepoResult<u64>;

    async fn block(&self, blocker_id: Uuid, target_id: Uuid, now: DateTime<Utc>)
    -> RepoResult<()>;

    async fn are_mutual_friends(&self, user_id: Uuid, other_user_id: Uuid) -> RepoResult<bool>;

    async fn list_friend_ids(&self, user_id: Uuid) -> RepoResult<Vec<Uuid>>;

    async fn list_incoming_pending(&self, user_id: Uuid)
    -> RepoResult<Vec<entities::Friendship>>;

    /// Creates the group and its member rows in one transaction.
    async fn create_group(&self, group: &entities::Group, member_ids: &[Uuid]) -> RepoResult<()>;

    async fn find_group(&self, group_id: Uuid) -> RepoResult<Option<entities::Group>>;

    async fn list_groups_for(&self, user_id: Uuid) -> RepoResult<Vec<entities::Group>>;

    async fn is_group_member(&self, group_id: Uuid, user_id: Uuid) -> RepoResult<bool>;

    async fn group_member_ids(&self, group_id: Uuid) -> RepoResult<Vec<Uuid>>;
}
