//! Expiry predicate and the background sweeper.

use crate::core::errors::ContentError;
use crate::core::models::SweepReport;
use crate::core::traits::{Clock, ContentResult, SweepService};
use crate::infrastructure::entities::{Message, Story};
use crate::infrastructure::traits::{MessageRepository, StoryRepository};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use di::{Ref, injectable};
use log::{debug, error, info};

/// Lifetime of a story, and of media messages sent without a ttl.
pub const DEFAULT_TTL_HOURS: u32 = 24;

/// Longest ttl a caller may ask for, one year.
pub const MAX_TTL_HOURS: u32 = 24 * 365;

pub trait Expires {
    fn expires_at(&self) -> Option<DateTime<Utc>>;
}

impl Expires for Message {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl Expires for Story {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        Some(self.expires_at)
    }
}

/// Expired content is treated as absent by every read and mutate path.
pub fn is_expired<T: Expires>(item: &T, now: DateTime<Utc>) -> bool {
    item.expires_at().is_some_and(|expires_at| expires_at < now)
}

/// Expiry instant for a ttl in hours. Zero and anything past
/// [`MAX_TTL_HOURS`] are rejected.
pub fn expiry_after(now: DateTime<Utc>, ttl_hours: u32) -> ContentResult<DateTime<Utc>> {
    if ttl_hours == 0 || ttl_hours > MAX_TTL_HOURS {
        return Err(ContentError::InvalidTtl);
    }
    now.checked_add_signed(Duration::hours(i64::from(ttl_hours)))
        .ok_or(ContentError::InvalidTtl)
}

#[injectable(SweepService)]
pub struct ExpirySweeper {
    messages: Ref<dyn MessageRepository>,
    stories: Ref<dyn StoryRepository>,
}

impl ExpirySweeper {
    pub fn new(messages: Ref<dyn MessageRepository>, stories: Ref<dyn StoryRepository>) -> Self {
        Self { messages, stories }
    }
}

#[async_trait]
impl SweepService for ExpirySweeper {
    async fn sweep_expired(&self, now: DateTime<Utc>) -> ContentResult<SweepReport> {
        let messages = self.messages.delete_expired_messages(now).await?;
        let stories = self.stories.delete_expired_stories(now).await?;
        Ok(SweepReport { messages, stories })
    }
}

/// Runs the sweep every `interval` until the runtime shuts down.
pub async fn background_task(
    sweeper: Ref<dyn SweepService>,
    clock: Ref<dyn Clock>,
    interval: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match sweeper.sweep_expired(clock.now()).await {
            Ok(report) if report.total() > 0 => info!(
                "Swept {} expired messages and {} expired stories",
                report.messages, report.stories
            ),
            Ok(_) => debug!("Nothing expired"),
            Err(e) => error!("Expiry sweep failed: {e}"),
        }
    }
}
