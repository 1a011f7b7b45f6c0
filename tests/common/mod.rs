//! Shared setup for the service-level tests.
//!
//! Services are wired by hand against a throwaway on-disk SQLite database so
//! that concurrent callers really race on separate connections.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ephemeral_content_api::core::expiry::ExpirySweeper;
use ephemeral_content_api::core::models::NewMessage;
use ephemeral_content_api::core::services::EphemeralMessageService;
use ephemeral_content_api::core::social::MySocialService;
use ephemeral_content_api::core::stories::EphemeralStoryService;
use ephemeral_content_api::core::traits::{Clock, MessageService, SocialService};
use ephemeral_content_api::infrastructure::database::DatabaseConnection;
use ephemeral_content_api::infrastructure::entities::{MediaKind, MediaRef, Message, Target};
use ephemeral_content_api::infrastructure::notifier::BroadcastChangeNotifier;
use ephemeral_content_api::infrastructure::repositories::DbMessageRepository;
use ephemeral_content_api::infrastructure::social::DbSocialGraphRepository;
use ephemeral_content_api::infrastructure::stories::DbStoryRepository;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub struct TestApp {
    // Keeps the database file alive for the duration of the test.
    _dir: TempDir,
    pub pool: SqlitePool,
    pub connection: Arc<DatabaseConnection>,
    pub social_repo: Arc<DbSocialGraphRepository>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<BroadcastChangeNotifier>,
    pub messages: Arc<EphemeralMessageService>,
    pub stories: Arc<EphemeralStoryService>,
    pub social: Arc<MySocialService>,
    pub sweeper: Arc<ExpirySweeper>,
}

pub async fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();

    let connection = Arc::new(DatabaseConnection::from_pool(pool.clone()));
    connection.migrate().await.unwrap();

    let clock = Arc::new(ManualClock::new(start_time()));
    let notifier = Arc::new(BroadcastChangeNotifier::with_capacity(256));
    let message_repo = Arc::new(DbMessageRepository::new(connection.clone()));
    let story_repo = Arc::new(DbStoryRepository::new(connection.clone()));
    let social_repo = Arc::new(DbSocialGraphRepository::new(connection.clone()));

    TestApp {
        _dir: dir,
        pool,
        messages: Arc::new(EphemeralMessageService::new(
            message_repo.clone(),
            social_repo.clone(),
            notifier.clone(),
            clock.clone(),
        )),
        stories: Arc::new(EphemeralStoryService::new(
            story_repo.clone(),
            social_repo.clone(),
            notifier.clone(),
            clock.clone(),
        )),
        social: Arc::new(MySocialService::new(social_repo.clone(), clock.clone())),
        sweeper: Arc::new(ExpirySweeper::new(message_repo, story_repo)),
        connection,
        social_repo,
        clock,
        notifier,
    }
}

impl TestApp {
    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Makes the two users mutual friends.
    pub async fn befriend(&self, a: Uuid, b: Uuid) {
        self.social.send_friend_request(a, b).await.unwrap();
        self.social.accept_friend_request(b, a).await.unwrap();
    }

    /// Two fresh users who are already friends.
    pub async fn friends(&self) -> (Uuid, Uuid) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        self.befriend(a, b).await;
        (a, b)
    }

    pub async fn send_text(&self, from: Uuid, to: Uuid, text: &str) -> Message {
        self.messages
            .send_message(from, text_to(to, text))
            .await
            .unwrap()
    }

    pub async fn send_image(&self, from: Uuid, to: Uuid) -> Message {
        self.messages
            .send_message(from, image_to(Target::User(to)))
            .await
            .unwrap()
    }
}

pub fn text_to(to: Uuid, text: &str) -> NewMessage {
    NewMessage {
        target: Target::User(to),
        content: Some(text.to_owned()),
        media: None,
        ttl_hours: None,
    }
}

pub fn image_to(target: Target) -> NewMessage {
    NewMessage {
        target,
        content: None,
        media: Some(image()),
        ttl_hours: None,
    }
}

pub fn image() -> MediaRef {
    MediaRef {
        url: format!("/media/files/{}.jpg", Uuid::new_v4()),
        kind: MediaKind::Image,
    }
}
