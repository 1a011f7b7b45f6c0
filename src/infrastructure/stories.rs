//! Story persistence

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{FriendshipStatus, Story, StoryView, ViewerStory};
use crate::infrastructure::repositories::db_error;
use crate::infrastructure::traits::{RepoResult, StoryRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use uuid::Uuid;

#[injectable(StoryRepository)]
pub struct DbStoryRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbStoryRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl StoryRepository for DbStoryRepository {
    async fn insert_story(&self, story: &Story) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO stories (id, owner_id, media_url, media_kind, caption, created_at, expires_at, view_count) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(story.id)
        .bind(story.owner_id)
        .bind(&story.media.url)
        .bind(story.media.kind)
        .bind(story.caption.as_deref())
        .bind(story.created_at)
        .bind(story.expires_at)
        .bind(story.view_count)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_story(&self, story_id: Uuid) -> RepoResult<Option<Story>> {
        sqlx::query_as("SELECT * FROM stories WHERE id = ?")
            .bind(story_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn list_stories_by_owner(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Story>> {
        sqlx::query_as(
            "SELECT * FROM stories WHERE owner_id = ? AND expires_at >= ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(owner_id)
        .bind(now)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn list_friend_stories(
        &self,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<ViewerStory>> {
        sqlx::query_as(
            "SELECT stories.id AS id, stories.owner_id AS owner_id, stories.media_url AS media_url, stories.media_kind AS media_kind, stories.caption AS caption, stories.created_at AS created_at, stories.expires_at AS expires_at, stories.view_count AS view_count, EXISTS (SELECT 1 FROM story_views WHERE story_views.story_id = stories.id AND story_views.viewer_id = ?) AS viewed FROM stories INNER JOIN friendships AS forward ON forward.user_id = ? AND forward.friend_id = stories.owner_id AND forward.status = ? INNER JOIN friendships AS reverse ON reverse.user_id = stories.owner_id AND reverse.friend_id = ? AND reverse.status = ? WHERE stories.expires_at >= ? ORDER BY stories.owner_id, stories.created_at ASC, stories.rowid ASC",
        )
        .bind(viewer_id)
        .bind(viewer_id)
        .bind(FriendshipStatus::Accepted)
        .bind(viewer_id)
        .bind(FriendshipStatus::Accepted)
        .bind(now)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn record_view(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        let inserted = sqlx::query(
            "INSERT INTO story_views (story_id, viewer_id, viewed_at) SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM stories WHERE id = ? AND expires_at >= ?) ON CONFLICT (story_id, viewer_id) DO NOTHING",
        )
        .bind(story_id)
        .bind(viewer_id)
        .bind(now)
        .bind(story_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Ok(false);
        }

        sqlx::query("UPDATE stories SET view_count = view_count + 1 WHERE id = ?")
            .bind(story_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn list_views(&self, story_id: Uuid) -> RepoResult<Vec<StoryView>> {
        sqlx::query_as(
            "SELECT story_id, viewer_id, viewed_at FROM story_views WHERE story_id = ? ORDER BY viewed_at ASC",
        )
        .bind(story_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn delete_story(&self, story_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(story_id)
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_stories(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        sqlx::query(
            "DELETE FROM story_views WHERE story_id IN (SELECT id FROM stories WHERE expires_at < ?)",
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let result = sqlx::query("DELETE FROM stories WHERE expires_at < ?")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(result.rows_affected())
    }
}
