//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::Message;
use crate::infrastructure::traits::{MessageRepository, RepoResult, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::error;
use uuid::Uuid;

pub(crate) fn db_error(e: sqlx::Error) -> RepositoryError {
    error!("{e}");
    RepositoryError::Database(e)
}

#[injectable(MessageRepository)]
pub struct DbMessageRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbMessageRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn insert_message(&self, message: &Message) -> RepoResult<()> {
        let (media_url, media_kind) = match &message.media {
            Some(media) => (Some(media.url.as_str()), Some(media.kind)),
            None => (None, None),
        };

        sqlx::query(
            "INSERT INTO messages (id, sender_id, recipient_id, group_id, content, media_url, media_kind, created_at, expires_at, read_at, first_viewed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.target.recipient_id())
        .bind(message.target.group_id())
        .bind(message.content.as_deref())
        .bind(media_url)
        .bind(media_kind)
        .bind(message.created_at)
        .bind(message.expires_at)
        .bind(message.read_at)
        .bind(message.first_viewed_at)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_message(&self, message_id: Uuid) -> RepoResult<Option<Message>> {
        sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(db_error)
    }

    async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Message>> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE ((sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?)) AND (expires_at IS NULL OR expires_at >= ?) ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .bind(other_user_id)
        .bind(other_user_id)
        .bind(user_id)
        .bind(now)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn list_direct_messages_involving(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Message>> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE recipient_id IS NOT NULL AND (sender_id = ? OR recipient_id = ?) AND (expires_at IS NULL OR expires_at >= ?) ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(now)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn list_group_messages(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Message>> {
        sqlx::query_as(
            "SELECT messages.id AS id, messages.sender_id AS sender_id, messages.recipient_id AS recipient_id, messages.group_id AS group_id, messages.content AS content, messages.media_url AS media_url, messages.media_kind AS media_kind, messages.created_at AS created_at, messages.expires_at AS expires_at, message_receipts.read_at AS read_at, message_receipts.first_viewed_at AS first_viewed_at FROM messages LEFT JOIN message_receipts ON message_receipts.message_id = messages.id AND message_receipts.user_id = ? WHERE messages.group_id = ? AND (messages.expires_at IS NULL OR messages.expires_at >= ?) ORDER BY messages.created_at ASC, messages.rowid ASC",
        )
        .bind(member_id)
        .bind(group_id)
        .bind(now)
        .fetch_all(&**self.connection)
        .await
        .map_err(db_error)
    }

    async fn mark_direct_read(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = ? WHERE id = ? AND recipient_id = ? AND read_at IS NULL AND (expires_at IS NULL OR expires_at >= ?)",
        )
        .bind(now)
        .bind(message_id)
        .bind(recipient_id)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_direct_first_viewed(
        &self,
        message_id: Uuid,
        recipient_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET first_viewed_at = ?, read_at = COALESCE(read_at, ?) WHERE id = ? AND recipient_id = ? AND media_url IS NOT NULL AND first_viewed_at IS NULL AND (expires_at IS NULL OR expires_at >= ?)",
        )
        .bind(now)
        .bind(now)
        .bind(message_id)
        .bind(recipient_id)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_group_read(
        &self,
        message_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT INTO message_receipts (message_id, user_id, read_at) SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM messages WHERE id = ? AND group_id IS NOT NULL AND (expires_at IS NULL OR expires_at >= ?)) ON CONFLICT (message_id, user_id) DO UPDATE SET read_at = excluded.read_at WHERE message_receipts.read_at IS NULL",
        )
        .bind(message_id)
        .bind(member_id)
        .bind(now)
        .bind(message_id)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_group_first_viewed(
        &self,
        message_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT INTO message_receipts (message_id, user_id, read_at, first_viewed_at) SELECT ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM messages WHERE id = ? AND group_id IS NOT NULL AND media_url IS NOT NULL AND (expires_at IS NULL OR expires_at >= ?)) ON CONFLICT (message_id, user_id) DO UPDATE SET first_viewed_at = excluded.first_viewed_at, read_at = COALESCE(message_receipts.read_at, excluded.read_at) WHERE message_receipts.first_viewed_at IS NULL",
        )
        .bind(message_id)
        .bind(member_id)
        .bind(now)
        .bind(now)
        .bind(message_id)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_message(&self, message_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id)
            .execute(&**self.connection)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_messages(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result =
            sqlx::query("DELETE FROM messages WHERE expires_at IS NOT NULL AND expires_at < ?")
                .bind(now)
                .execute(&**self.connection)
                .await
                .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}
