//! Database and schema tests
//!
//! Tests SQLite migrations, entity storage, and schema constraints

use chrono::{Duration, Utc};
use ephemeral_content_api::infrastructure::entities::{
    FriendshipStatus, MediaKind, Message, MessageKind, Story, Target,
};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Setup test database with migrations
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

async fn insert_group(pool: &SqlitePool) -> Uuid {
    let group_id = Uuid::new_v4();
    sqlx::query("INSERT INTO chat_groups (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(group_id)
        .bind("friends")
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    group_id
}

#[tokio::test]
async fn test_database_migrations_work() {
    let pool = setup_test_db().await;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for table in [
        "chat_groups",
        "friendships",
        "group_members",
        "message_receipts",
        "messages",
        "stories",
        "story_views",
    ] {
        assert!(tables.contains(&table.to_owned()), "missing {table}");
    }
}

#[tokio::test]
async fn test_message_row_decodes_target_and_media() {
    let pool = setup_test_db().await;

    let message_id = Uuid::new_v4();
    let recipient = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO messages (id, sender_id, recipient_id, media_url, media_kind, created_at, expires_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(message_id)
    .bind(Uuid::new_v4())
    .bind(recipient)
    .bind("/media/files/clip.mp4")
    .bind(MediaKind::Video)
    .bind(now)
    .bind(now + Duration::hours(24))
    .execute(&pool)
    .await
    .unwrap();

    let message: Message = sqlx::query_as("SELECT * FROM messages WHERE id = ?")
        .bind(message_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(message.target, Target::User(recipient));
    assert_eq!(message.kind(), MessageKind::Video);
    assert!(message.is_view_once());
    assert_eq!(message.created_at, now);
    assert_eq!(message.read_at, None);
}

#[tokio::test]
async fn test_message_needs_exactly_one_target() {
    let pool = setup_test_db().await;
    let group_id = insert_group(&pool).await;

    let both = sqlx::query(
        "INSERT INTO messages (id, sender_id, recipient_id, group_id, content, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind(group_id)
    .bind("hi")
    .bind(Utc::now())
    .execute(&pool)
    .await;
    assert!(both.is_err());

    let neither = sqlx::query(
        "INSERT INTO messages (id, sender_id, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind("hi")
    .bind(Utc::now())
    .execute(&pool)
    .await;
    assert!(neither.is_err());
}

#[tokio::test]
async fn test_message_needs_content_or_media() {
    let pool = setup_test_db().await;

    let empty = sqlx::query(
        "INSERT INTO messages (id, sender_id, recipient_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind(Utc::now())
    .execute(&pool)
    .await;
    assert!(empty.is_err());

    let url_without_kind = sqlx::query(
        "INSERT INTO messages (id, sender_id, recipient_id, media_url, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind("/media/files/a.png")
    .bind(Utc::now())
    .execute(&pool)
    .await;
    assert!(url_without_kind.is_err());
}

#[tokio::test]
async fn test_friendship_status_storage() {
    let pool = setup_test_db().await;
    let user = Uuid::new_v4();

    for (status, value) in [
        (FriendshipStatus::Pending, 1),
        (FriendshipStatus::Accepted, 2),
        (FriendshipStatus::Blocked, 3),
    ] {
        let friend = Uuid::new_v4();
        sqlx::query("INSERT INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, ?, ?)")
            .bind(user)
            .bind(friend)
            .bind(status)
            .bind(Utc::now())
            .execute(&pool)
            .await
            .unwrap();

        let stored: i64 = sqlx::query_scalar("SELECT status FROM friendships WHERE friend_id = ?")
            .bind(friend)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, value);
    }

    let self_edge = sqlx::query("INSERT INTO friendships (user_id, friend_id, status, created_at) VALUES (?, ?, ?, ?)")
        .bind(user)
        .bind(user)
        .bind(FriendshipStatus::Accepted)
        .bind(Utc::now())
        .execute(&pool)
        .await;
    assert!(self_edge.is_err());
}

#[tokio::test]
async fn test_story_cascade_delete() {
    let pool = setup_test_db().await;

    let story_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO stories (id, owner_id, media_url, media_kind, created_at, expires_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(story_id)
    .bind(Uuid::new_v4())
    .bind("/media/files/s.jpg")
    .bind(MediaKind::Image)
    .bind(now)
    .bind(now + Duration::hours(24))
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO story_views (story_id, viewer_id, viewed_at) VALUES (?, ?, ?)")
        .bind(story_id)
        .bind(Uuid::new_v4())
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

    let story: Story = sqlx::query_as("SELECT * FROM stories WHERE id = ?")
        .bind(story_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(story.view_count, 0);
    assert_eq!(story.media.kind, MediaKind::Image);

    // Delete story (should cascade to views)
    sqlx::query("DELETE FROM stories WHERE id = ?")
        .bind(story_id)
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM story_views WHERE story_id = ?")
        .bind(story_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_group_message_receipts_cascade() {
    let pool = setup_test_db().await;
    let group_id = insert_group(&pool).await;
    let message_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO messages (id, sender_id, group_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(message_id)
    .bind(Uuid::new_v4())
    .bind(group_id)
    .bind("hello group")
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO message_receipts (message_id, user_id, read_at) VALUES (?, ?, ?)")
        .bind(message_id)
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM chat_groups WHERE id = ?")
        .bind(group_id)
        .execute(&pool)
        .await
        .unwrap();

    let receipts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message_receipts")
        .fetch_one(&pool)
        .await
        .unwrap();
    let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!((receipts, messages), (0, 0));
}
