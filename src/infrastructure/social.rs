//! Friendships and groups

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Friendship, FriendshipStatus, Group};
use crate::infrastructure::repositories::db_error;
use crate::infrastructure::traits::{RepoResult, SocialGraphRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use uuid::Uuid;

#[injectable(SocialGraphRepository)]
pub struct DbSocialGraphRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbSocialGraphRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SocialGraphRepository for DbSocialGraphRepository {
    async fn find_edge(&self, user_id: Uuid, friend_id: Uuid) -> RepoResult<Option<Friendship>> {
        sqlx::query_as(
            "SELECT user_id, friend_id, status, created_at FROM friendships WHERE user_id = ? AND friend_id = ?",
        )
        .bind(user_id)
        .bind(friend_id)
        .fetch_optional(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn insert_pending(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(friend_id)
        .bind(FriendshipStatus::Pending)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn accept_pending(
        &self,
        requester_id: Uuid,
        accepter_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        let accepted = sqlx::query(
            "UPDATE friendships SET status = ? WHERE user_id = ? AND friend_id = ? AND status = ?",
        )
        .bind(FriendshipStatus::Accepted)
        .bind(requester_id)
        .bind(accepter_id)
        .bind(FriendshipStatus::Pending)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if accepted.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, ?, ?) ON CONFLICT (user_id, friend_id) DO UPDATE SET status = excluded.status",
        )
        .bind(accepter_id)
        .bind(requester_id)
        .bind(FriendshipStatus::Accepted)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn delete_edge(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
        status: FriendshipStatus,
    ) -> RepoResult<bool> {
        let result =
            sqlx::query("DELETE FROM friendships WHERE user_id = ? AND friend_id = ? AND status = ?")
                .bind(user_id)
                .bind(friend_id)
                .bind(status)
                .execute(&**self.connection)
                .await
                .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_pair(&self, user_id: Uuid, other_user_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query(
            "DELETE FROM friendships WHERE ((user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)) AND status <> ?",
        )
        .bind(user_id)
        .bind(other_user_id)
        .bind(other_user_id)
        .bind(user_id)
        .bind(FriendshipStatus::Blocked)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn block(&self, blocker_id: Uuid, target_id: Uuid, now: DateTime<Utc>) -> RepoResult<()> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, ?, ?) ON CONFLICT (user_id, friend_id) DO UPDATE SET status = excluded.status",
        )
        .bind(blocker_id)
        .bind(target_id)
        .bind(FriendshipStatus::Blocked)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // The blocked user keeps only their own block edge, if any.
        sqlx::query("DELETE FROM friendships WHERE user_id = ? AND friend_id = ? AND status <> ?")
            .bind(target_id)
            .bind(blocker_id)
            .bind(FriendshipStatus::Blocked)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)
    }

    async fn are_mutual_friends(&self, user_id: Uuid, other_user_id: Uuid) -> RepoResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM friendships AS forward INNER JOIN friendships AS reverse ON reverse.user_id = forward.friend_id AND reverse.friend_id = forward.user_id WHERE forward.user_id = ? AND forward.friend_id = ? AND forward.status = ? AND reverse.status = ?",
        )
        .bind(user_id)
        .bind(other_user_id)
        .bind(FriendshipStatus::Accepted)
        .bind(FriendshipStatus::Accepted)
        .fetch_one(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(count > 0)
    }

    async fn list_friend_ids(&self, user_id: Uuid) -> RepoResult<Vec<Uuid>> {
        sqlx::query_scalar(
            "SELECT forward.friend_id FROM friendships AS forward INNER JOIN friendships AS reverse ON reverse.user_id = forward.friend_id AND reverse.friend_id = forward.user_id WHERE forward.user_id = ? AND forward.status = ? AND reverse.status = ? ORDER BY forward.friend_id",
        )
        .bind(user_id)
        .bind(FriendshipStatus::Accepted)
        .bind(FriendshipStatus::Accepted)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn list_incoming_pending(&self, user_id: Uuid) -> RepoResult<Vec<Friendship>> {
        sqlx::query_as(
            "SELECT user_id, friend_id, status, created_at FROM friendships WHERE friend_id = ? AND status = ? ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(FriendshipStatus::Pending)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn create_group(&self, group: &Group, member_ids: &[Uuid]) -> RepoResult<()> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        sqlx::query("INSERT INTO chat_groups (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(group.id)
            .bind(&group.name)
            .bind(group.owner_id)
            .bind(group.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for member_id in member_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(group.id)
            .bind(member_id)
            .bind(group.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)
    }

    async fn find_group(&self, group_id: Uuid) -> RepoResult<Option<Group>> {
        sqlx::query_as("SELECT id, name, owner_id, created_at FROM chat_groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn list_groups_for(&self, user_id: Uuid) -> RepoResult<Vec<Group>> {
        sqlx::query_as(
            "SELECT chat_groups.id, chat_groups.name, chat_groups.owner_id, chat_groups.created_at FROM chat_groups INNER JOIN group_members ON group_members.group_id = chat_groups.id WHERE group_members.user_id = ? ORDER BY chat_groups.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn is_group_member(&self, group_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id)
                .bind(user_id)
                .fetch_one(&**self.connection)
                .await
                .map_err(db_error)?;

        Ok(count > 0)
    }

    async fn group_member_ids(&self, group_id: Uuid) -> RepoResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT user_id FROM group_members WHERE group_id = ? ORDER BY user_id")
            .bind(group_id)
            .fetch_all(&**self.connection)
            .await
            .map_err(db_error)
    }
}
