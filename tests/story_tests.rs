//! Story service tests
//!
//! Friend gating, idempotent view counting, feed ordering and expiry.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{image, setup};
use ephemeral_content_api::core::errors::ContentError;
use ephemeral_content_api::core::expiry::MAX_TTL_HOURS;
use ephemeral_content_api::core::models::NewStory;
use ephemeral_content_api::core::stories::EphemeralStoryService;
use ephemeral_content_api::core::traits::{SocialService, StoryService};
use ephemeral_content_api::infrastructure::entities::{
    FriendshipStatus, MediaKind, MediaRef, Story, StoryView, ViewerStory,
};
use ephemeral_content_api::infrastructure::stories::DbStoryRepository;
use ephemeral_content_api::infrastructure::traits::{RepoResult, StoryRepository};
use std::sync::Arc;
use uuid::Uuid;

/// Deletes the story right before a view is recorded, the way the owner or
/// the sweeper could in between.
struct VanishingStories {
    inner: DbStoryRepository,
}

#[async_trait]
impl StoryRepository for VanishingStories {
    async fn insert_story(&self, story: &Story) -> RepoResult<()> {
        self.inner.insert_story(story).await
    }

    async fn find_story(&self, story_id: Uuid) -> RepoResult<Option<Story>> {
        self.inner.find_story(story_id).await
    }

    async fn list_stories_by_owner(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Story>> {
        self.inner.list_stories_by_owner(owner_id, now).await
    }

    async fn list_friend_stories(
        &self,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<ViewerStory>> {
        self.inner.list_friend_stories(viewer_id, now).await
    }

    async fn record_view(
        &self,
        story_id: Uuid,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        self.inner.delete_story(story_id).await?;
        self.inner.record_view(story_id, viewer_id, now).await
    }

    async fn list_views(&self, story_id: Uuid) -> RepoResult<Vec<StoryView>> {
        self.inner.list_views(story_id).await
    }

    async fn delete_story(&self, story_id: Uuid) -> RepoResult<bool> {
        self.inner.delete_story(story_id).await
    }

    async fn delete_expired_stories(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        self.inner.delete_expired_stories(now).await
    }
}

fn story(caption: Option<&str>) -> NewStory {
    NewStory {
        media: image(),
        caption: caption.map(str::to_owned),
        ttl_hours: None,
    }
}

async fn post(app: &common::TestApp, owner: Uuid) -> Story {
    app.stories.create_story(owner, story(None)).await.unwrap()
}

#[tokio::test]
async fn test_create_story_lasts_one_day() {
    let app = setup().await;
    let owner = Uuid::new_v4();

    let created = app
        .stories
        .create_story(owner, story(Some("sunset")))
        .await
        .unwrap();

    assert_eq!(created.owner_id, owner);
    assert_eq!(created.view_count, 0);
    assert_eq!(created.caption.as_deref(), Some("sunset"));
    assert_eq!(created.expires_at, created.created_at + Duration::hours(24));

    let own = app.stories.get_own_stories(owner).await.unwrap();
    assert_eq!(own, vec![created]);
}

#[tokio::test]
async fn test_create_story_validation() {
    let app = setup().await;
    let owner = Uuid::new_v4();

    let no_media = app
        .stories
        .create_story(
            owner,
            NewStory {
                media: MediaRef {
                    url: "  ".to_owned(),
                    kind: MediaKind::Video,
                },
                caption: None,
                ttl_hours: None,
            },
        )
        .await;
    assert!(matches!(no_media, Err(ContentError::EmptyContent)));

    let zero_ttl = app
        .stories
        .create_story(
            owner,
            NewStory {
                ttl_hours: Some(0),
                ..story(None)
            },
        )
        .await;
    assert!(matches!(zero_ttl, Err(ContentError::InvalidTtl)));

    for ttl_hours in [MAX_TTL_HOURS + 1, u32::MAX] {
        let too_long = app
            .stories
            .create_story(
                owner,
                NewStory {
                    ttl_hours: Some(ttl_hours),
                    ..story(None)
                },
            )
            .await;
        assert!(matches!(too_long, Err(ContentError::InvalidTtl)));
    }
    assert!(app.stories.get_own_stories(owner).await.unwrap().is_empty());

    let short = app
        .stories
        .create_story(
            owner,
            NewStory {
                ttl_hours: Some(1),
                ..story(Some("   "))
            },
        )
        .await
        .unwrap();
    assert_eq!(short.caption, None);
    assert_eq!(short.expires_at, short.created_at + Duration::hours(1));
}

#[tokio::test]
async fn test_view_story_counts_each_viewer_once() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;

    assert!(app.stories.view_story(posted.id, viewer).await.unwrap());
    assert!(!app.stories.view_story(posted.id, viewer).await.unwrap());

    let own = app.stories.get_own_stories(owner).await.unwrap();
    assert_eq!(own[0].view_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_views_by_one_viewer_count_once() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let story_id = post(&app, owner).await.id;

    let attempts: Vec<_> = (0..10)
        .map(|_| {
            let stories = app.stories.clone();
            tokio::spawn(async move { stories.view_story(story_id, viewer).await })
        })
        .collect();

    let mut first_views = 0;
    for attempt in attempts {
        if attempt.await.unwrap().unwrap() {
            first_views += 1;
        }
    }

    assert_eq!(first_views, 1);
    let own = app.stories.get_own_stories(owner).await.unwrap();
    assert_eq!(own[0].view_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_views_by_many_viewers_all_count() {
    let app = setup().await;
    let owner = Uuid::new_v4();
    let mut viewers = Vec::new();
    for _ in 0..6 {
        let viewer = Uuid::new_v4();
        app.befriend(owner, viewer).await;
        viewers.push(viewer);
    }
    let story_id = post(&app, owner).await.id;

    let attempts: Vec<_> = viewers
        .iter()
        .map(|viewer| {
            let stories = app.stories.clone();
            let viewer = *viewer;
            tokio::spawn(async move { stories.view_story(story_id, viewer).await })
        })
        .collect();
    for attempt in attempts {
        assert!(attempt.await.unwrap().unwrap());
    }

    let own = app.stories.get_own_stories(owner).await.unwrap();
    assert_eq!(own[0].view_count, 6);
    let viewers_seen = app.stories.get_story_viewers(story_id, owner).await.unwrap();
    assert_eq!(viewers_seen.len(), 6);
}

#[tokio::test]
async fn test_only_mutual_friends_can_view() {
    let app = setup().await;
    let owner = Uuid::new_v4();
    let requester = Uuid::new_v4();
    app.social.send_friend_request(requester, owner).await.unwrap();
    let posted = post(&app, owner).await;

    let pending = app.stories.view_story(posted.id, requester).await;
    assert!(matches!(pending, Err(ContentError::NotAuthorized)));

    let stranger = app.stories.view_story(posted.id, Uuid::new_v4()).await;
    assert!(matches!(stranger, Err(ContentError::NotAuthorized)));

    assert!(app.stories.get_friends_stories(requester).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_half_blocked_friendship_hides_stories() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;

    // viewer -> owner stays accepted, owner -> viewer is blocked.
    sqlx::query("UPDATE friendships SET status = ? WHERE user_id = ? AND friend_id = ?")
        .bind(FriendshipStatus::Blocked)
        .bind(owner)
        .bind(viewer)
        .execute(&app.pool)
        .await
        .unwrap();

    assert!(app.stories.get_friends_stories(viewer).await.unwrap().is_empty());
    let view = app.stories.view_story(posted.id, viewer).await;
    assert!(matches!(view, Err(ContentError::NotAuthorized)));

    // Same outcome when the viewer is the one who blocks.
    let (other_owner, blocker) = app.friends().await;
    let other = post(&app, other_owner).await;
    app.social.block_user(blocker, other_owner).await.unwrap();

    assert!(app.stories.get_friends_stories(blocker).await.unwrap().is_empty());
    let view = app.stories.view_story(other.id, blocker).await;
    assert!(matches!(view, Err(ContentError::NotAuthorized)));

    let own = app.stories.get_own_stories(owner).await.unwrap();
    assert_eq!(own[0].view_count, 0);
}

#[tokio::test]
async fn test_record_view_of_missing_story_is_not_counted() {
    let app = setup().await;
    let repo = DbStoryRepository::new(app.connection.clone());

    let recorded = repo
        .record_view(Uuid::new_v4(), Uuid::new_v4(), app.clock_now())
        .await
        .unwrap();
    assert!(!recorded);

    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;
    let after_expiry = posted.expires_at + Duration::seconds(1);
    assert!(!repo.record_view(posted.id, viewer, after_expiry).await.unwrap());
    assert!(repo.list_views(posted.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_view_of_story_deleted_midway_is_not_found() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;

    let stories = EphemeralStoryService::new(
        Arc::new(VanishingStories {
            inner: DbStoryRepository::new(app.connection.clone()),
        }),
        app.social_repo.clone(),
        app.notifier.clone(),
        app.clock.clone(),
    );

    let view = stories.view_story(posted.id, viewer).await;
    assert!(matches!(view, Err(ContentError::NotFound)));
}

#[tokio::test]
async fn test_owner_views_are_not_counted() {
    let app = setup().await;
    let owner = Uuid::new_v4();
    let posted = post(&app, owner).await;

    assert!(!app.stories.view_story(posted.id, owner).await.unwrap());

    let own = app.stories.get_own_stories(owner).await.unwrap();
    assert_eq!(own[0].view_count, 0);
    assert!(app.stories.get_story_viewers(posted.id, owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_friends_with_new_stories_come_first() {
    let app = setup().await;
    let viewer = Uuid::new_v4();
    let (early, late) = (Uuid::new_v4(), Uuid::new_v4());
    app.befriend(viewer, early).await;
    app.befriend(viewer, late).await;

    let first = post(&app, early).await;
    let second = post(&app, early).await;
    app.clock.advance(Duration::minutes(30));
    let latest = post(&app, late).await;

    let feed = app.stories.get_friends_stories(viewer).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].owner_id, late);
    assert_eq!(feed[0].latest_story_at, latest.created_at);
    assert!(feed[0].has_new_stories);
    assert_eq!(feed[1].owner_id, early);
    let ids: Vec<Uuid> = feed[1].stories.iter().map(|entry| entry.story.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    app.stories.view_story(latest.id, viewer).await.unwrap();
    app.stories.view_story(first.id, viewer).await.unwrap();

    let feed = app.stories.get_friends_stories(viewer).await.unwrap();
    assert_eq!(feed[0].owner_id, early);
    assert!(feed[0].has_new_stories);
    assert!(feed[0].stories[0].viewed);
    assert!(!feed[0].stories[1].viewed);
    assert_eq!(feed[1].owner_id, late);
    assert!(!feed[1].has_new_stories);
}

#[tokio::test]
async fn test_expired_stories_disappear() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;

    app.clock.advance(Duration::hours(24));
    assert_eq!(app.stories.get_friends_stories(viewer).await.unwrap().len(), 1);

    app.clock.advance(Duration::seconds(1));
    assert!(app.stories.get_friends_stories(viewer).await.unwrap().is_empty());
    assert!(app.stories.get_own_stories(owner).await.unwrap().is_empty());

    let view = app.stories.view_story(posted.id, viewer).await;
    assert!(matches!(view, Err(ContentError::NotFound)));
}

#[tokio::test]
async fn test_viewers_are_private_to_the_owner() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;
    app.stories.view_story(posted.id, viewer).await.unwrap();

    let views = app.stories.get_story_viewers(posted.id, owner).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].viewer_id, viewer);
    assert_eq!(views[0].viewed_at, app.clock_now());

    let peek = app.stories.get_story_viewers(posted.id, viewer).await;
    assert!(matches!(peek, Err(ContentError::NotAuthorized)));
}

#[tokio::test]
async fn test_delete_story() {
    let app = setup().await;
    let (owner, viewer) = app.friends().await;
    let posted = post(&app, owner).await;
    app.stories.view_story(posted.id, viewer).await.unwrap();

    let by_viewer = app.stories.delete_story(posted.id, viewer).await;
    assert!(matches!(by_viewer, Err(ContentError::NotAuthorized)));

    app.stories.delete_story(posted.id, owner).await.unwrap();

    assert!(app.stories.get_own_stories(owner).await.unwrap().is_empty());
    let again = app.stories.delete_story(posted.id, owner).await;
    assert!(matches!(again, Err(ContentError::NotFound)));
}

#[tokio::test]
async fn test_scenario_friend_views_new_story() {
    let app = setup().await;
    let (a, b) = app.friends().await;
    let posted = post(&app, a).await;

    let feed = app.stories.get_friends_stories(b).await.unwrap();
    assert_eq!(feed[0].owner_id, a);
    assert!(feed[0].has_new_stories);
    assert_eq!(feed[0].stories[0].story.view_count, 0);

    app.stories.view_story(posted.id, b).await.unwrap();

    let feed = app.stories.get_friends_stories(b).await.unwrap();
    assert!(!feed[0].has_new_stories);
    assert_eq!(feed[0].stories[0].story.view_count, 1);
}
