//! 24-hour stories broadcast to mutual friends.

use crate::core::errors::ContentError;
use crate::core::expiry::{DEFAULT_TTL_HOURS, expiry_after, is_expired};
use crate::core::models::{Change, FriendStories, NewStory};
use crate::core::traits::{ChangeNotifier, Clock, ContentResult, StoryService};
use crate::infrastructure::entities::{Story, StoryView, ViewerStory};
use crate::infrastructure::traits::{SocialGraphRepository, StoryRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::debug;
use std::collections::BTreeMap;
use uuid::Uuid;

#[injectable(StoryService)]
pub struct EphemeralStoryService {
    stories: Ref<dyn StoryRepository>,
    social: Ref<dyn SocialGraphRepository>,
    notifier: Ref<dyn ChangeNotifier>,
    clock: Ref<dyn Clock>,
}

impl EphemeralStoryService {
    pub fn new(
        stories: Ref<dyn StoryRepository>,
        social: Ref<dyn SocialGraphRepository>,
        notifier: Ref<dyn ChangeNotifier>,
        clock: Ref<dyn Clock>,
    ) -> Self {
        Self {
            stories,
            social,
            notifier,
            clock,
        }
    }

    async fn visible_story(&self, story_id: Uuid, now: DateTime<Utc>) -> ContentResult<Story> {
        match self.stories.find_story(story_id).await? {
            Some(story) if !is_expired(&story, now) => Ok(story),
            _ => Err(ContentError::NotFound),
        }
    }
}

#[async_trait]
impl StoryService for EphemeralStoryService {
    async fn create_story(&self, owner_id: Uuid, story: NewStory) -> ContentResult<Story> {
        if story.media.url.trim().is_empty() {
            return Err(ContentError::EmptyContent);
        }

        let now = self.clock.now();
        let expires_at = expiry_after(now, story.ttl_hours.unwrap_or(DEFAULT_TTL_HOURS))?;
        let new_story = Story {
            id: Uuid::new_v4(),
            owner_id,
            media: story.media,
            caption: story.caption.filter(|caption| !caption.trim().is_empty()),
            created_at: now,
            expires_at,
            view_count: 0,
        };

        self.stories.insert_story(&new_story).await?;
        debug!("Story {} posted by {}", new_story.id, owner_id);

        for friend_id in self.social.list_friend_ids(owner_id).await? {
            self.notifier.publish(
                Change::StoryCreated {
                    story_id: new_story.id,
                    owner_id,
                    created_at: now,
                }
                .to(friend_id),
            );
        }

        Ok(new_story)
    }

    async fn get_friends_stories(&self, viewer_id: Uuid) -> ContentResult<Vec<FriendStories>> {
        let now = self.clock.now();
        let stories = self.stories.list_friend_stories(viewer_id, now).await?;

        Ok(group_by_owner(stories, now))
    }

    async fn get_own_stories(&self, owner_id: Uuid) -> ContentResult<Vec<Story>> {
        let now = self.clock.now();
        Ok(self.stories.list_stories_by_owner(owner_id, now).await?)
    }

    async fn view_story(&self, story_id: Uuid, viewer_id: Uuid) -> ContentResult<bool> {
        let now = self.clock.now();
        let story = self.visible_story(story_id, now).await?;

        if story.owner_id == viewer_id {
            return Ok(false);
        }
        if !self
            .social
            .are_mutual_friends(viewer_id, story.owner_id)
            .await?
        {
            return Err(ContentError::NotAuthorized);
        }

        let first_view = self.stories.record_view(story_id, viewer_id, now).await?;
        if first_view {
            debug!("Story {story_id} viewed by {viewer_id}");
            self.notifier.publish(
                Change::StoryViewed {
                    story_id,
                    viewer_id,
                }
                .to(story.owner_id),
            );
        } else {
            // Counted before, unless the story was deleted or swept meanwhile.
            self.visible_story(story_id, now).await?;
        }

        Ok(first_view)
    }

    async fn get_story_viewers(
        &self,
        story_id: Uuid,
        caller_id: Uuid,
    ) -> ContentResult<Vec<StoryView>> {
        let story = self.visible_story(story_id, self.clock.now()).await?;
        if story.owner_id != caller_id {
            return Err(ContentError::NotAuthorized);
        }

        Ok(self.stories.list_views(story_id).await?)
    }

    async fn delete_story(&self, story_id: Uuid, caller_id: Uuid) -> ContentResult<()> {
        let story = self.visible_story(story_id, self.clock.now()).await?;
        if story.owner_id != caller_id {
            return Err(ContentError::NotAuthorized);
        }

        if !self.stories.delete_story(story_id).await? {
            return Err(ContentError::NotFound);
        }
        debug!("Story {story_id} deleted by {caller_id}");
        Ok(())
    }
}

/// Friends with unseen stories come first, then the most recent poster,
/// then the owner id.
pub fn group_by_owner(stories: Vec<ViewerStory>, now: DateTime<Utc>) -> Vec<FriendStories> {
    let mut by_owner: BTreeMap<Uuid, Vec<ViewerStory>> = BTreeMap::new();
    for entry in stories {
        if !is_expired(&entry.story, now) {
            by_owner.entry(entry.story.owner_id).or_default().push(entry);
        }
    }

    let mut feed: Vec<FriendStories> = by_owner
        .into_iter()
        .filter_map(|(owner_id, stories)| {
            let latest_story_at = stories.iter().map(|entry| entry.story.created_at).max()?;
            Some(FriendStories {
                owner_id,
                has_new_stories: stories.iter().any(|entry| !entry.viewed),
                latest_story_at,
                stories,
            })
        })
        .collect();

    feed.sort_by(|a, b| {
        b.has_new_stories
            .cmp(&a.has_new_stories)
            .then_with(|| b.latest_story_at.cmp(&a.latest_story_at))
            .then_with(|| a.owner_id.cmp(&b.owner_id))
    });
    feed
}
