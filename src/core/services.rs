//! Implementations for the service the app needs.
//!

use crate::core::errors::ContentError;
use crate::core::expiry::{DEFAULT_TTL_HOURS, expiry_after, is_expired};
use crate::core::models::{Change, Conversation, NewMessage};
use crate::core::traits::{ChangeNotifier, Clock, ContentResult, MessageService};
use crate::infrastructure::entities::{Message, Target};
use crate::infrastructure::traits::{MessageRepository, SocialGraphRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::debug;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use uuid::Uuid;

#[injectable(MessageService)]
pub struct EphemeralMessageService {
    messages: Ref<dyn MessageRepository>,
    social: Ref<dyn SocialGraphRepository>,
    notifier: Ref<dyn ChangeNotifier>,
    clock: Ref<dyn Clock>,
}

impl EphemeralMessageService {
    pub fn new(
        messages: Ref<dyn MessageRepository>,
        social: Ref<dyn SocialGraphRepository>,
        notifier: Ref<dyn ChangeNotifier>,
        clock: Ref<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            social,
            notifier,
            clock,
        }
    }

    /// Loads a message, treating expired ones as missing.
    async fn visible_message(
        &self,
        message_id: Uuid,
        now: DateTime<Utc>,
    ) -> ContentResult<Message> {
        match self.messages.find_message(message_id).await? {
            Some(message) if !is_expired(&message, now) => Ok(message),
            _ => Err(ContentError::NotFound),
        }
    }

    async fn ensure_recipient(&self, message: &Message, caller_id: Uuid) -> ContentResult<()> {
        let is_recipient = match message.target {
            Target::User(recipient_id) => recipient_id == caller_id,
            Target::Group(group_id) => {
                message.sender_id != caller_id
                    && self.social.is_group_member(group_id, caller_id).await?
            }
        };

        if is_recipient {
            Ok(())
        } else {
            Err(ContentError::NotAuthorized)
        }
    }

    async fn ensure_valid_target(&self, sender_id: Uuid, target: Target) -> ContentResult<()> {
        let valid = match target {
            Target::User(recipient_id) => {
                recipient_id != sender_id
                    && self
                        .social
                        .are_mutual_friends(sender_id, recipient_id)
                        .await?
            }
            Target::Group(group_id) => {
                self.social.find_group(group_id).await?.is_some()
                    && self.social.is_group_member(group_id, sender_id).await?
            }
        };

        if valid {
            Ok(())
        } else {
            Err(ContentError::InvalidTarget)
        }
    }

    /// Everyone on the receiving end of `message`.
    async fn audience(&self, message: &Message) -> ContentResult<Vec<Uuid>> {
        Ok(match message.target {
            Target::User(recipient_id) => vec![recipient_id],
            Target::Group(group_id) => self
                .social
                .group_member_ids(group_id)
                .await?
                .into_iter()
                .filter(|member_id| *member_id != message.sender_id)
                .collect(),
        })
    }
}

#[async_trait]
impl MessageService for EphemeralMessageService {
    async fn send_message(&self, sender_id: Uuid, message: NewMessage) -> ContentResult<Message> {
        let content = message.content.filter(|text| !text.trim().is_empty());
        let media = message.media.filter(|media| !media.url.trim().is_empty());
        if content.is_none() && media.is_none() {
            return Err(ContentError::EmptyContent);
        }

        let now = self.clock.now();
        let expires_at = message
            .ttl_hours
            .or(media.is_some().then_some(DEFAULT_TTL_HOURS))
            .map(|hours| expiry_after(now, hours))
            .transpose()?;

        self.ensure_valid_target(sender_id, message.target).await?;

        let new_message = Message {
            id: Uuid::new_v4(),
            sender_id,
            target: message.target,
            content,
            media,
            created_at: now,
            expires_at,
            read_at: None,
            first_viewed_at: None,
        };

        self.messages.insert_message(&new_message).await?;
        debug!(
            "Message {} sent by {} to {:?}",
            new_message.id, sender_id, new_message.target
        );

        for user_id in self.audience(&new_message).await? {
            self.notifier.publish(
                Change::MessageCreated {
                    message_id: new_message.id,
                    sender_id,
                    group_id: new_message.target.group_id(),
                    created_at: now,
                }
                .to(user_id),
            );
        }

        Ok(new_message)
    }

    async fn get_messages_with(
        &self,
        current_user_id: Uuid,
        other_user_id: Uuid,
    ) -> ContentResult<Vec<Message>> {
        if current_user_id == other_user_id {
            return Err(ContentError::InvalidTarget);
        }

        let now = self.clock.now();
        let messages = self
            .messages
            .list_direct_messages(current_user_id, other_user_id, now)
            .await?;

        Ok(messages
            .into_iter()
            .filter(|message| !is_expired(message, now))
            .collect())
    }

    async fn get_group_messages(
        &self,
        current_user_id: Uuid,
        group_id: Uuid,
    ) -> ContentResult<Vec<Message>> {
        if self.social.find_group(group_id).await?.is_none() {
            return Err(ContentError::NotFound);
        }
        if !self.social.is_group_member(group_id, current_user_id).await? {
            return Err(ContentError::NotAuthorized);
        }

        let now = self.clock.now();
        let messages = self
            .messages
            .list_group_messages(group_id, current_user_id, now)
            .await?;

        Ok(messages
            .into_iter()
            .filter(|message| !is_expired(message, now))
            .collect())
    }

    async fn mark_read(&self, message_id: Uuid, caller_id: Uuid) -> ContentResult<bool> {
        let now = self.clock.now();
        let message = self.visible_message(message_id, now).await?;
        self.ensure_recipient(&message, caller_id).await?;

        let changed = match message.target {
            Target::User(_) => {
                self.messages
                    .mark_direct_read(message_id, caller_id, now)
                    .await?
            }
            Target::Group(_) => {
                self.messages
                    .mark_group_read(message_id, caller_id, now)
                    .await?
            }
        };

        if !changed {
            // Already read, unless it was deleted or swept since it was loaded.
            self.visible_message(message_id, now).await?;
            return Ok(false);
        }

        debug!("Message {message_id} read by {caller_id}");
        self.notifier.publish(
            Change::MessageRead {
                message_id,
                reader_id: caller_id,
                read_at: now,
            }
            .to(message.sender_id),
        );

        Ok(true)
    }

    async fn mark_first_viewed(
        &self,
        message_id: Uuid,
        caller_id: Uuid,
    ) -> ContentResult<Message> {
        let now = self.clock.now();
        let message = self.visible_message(message_id, now).await?;
        self.ensure_recipient(&message, caller_id).await?;
        if !message.is_view_once() {
            return Err(ContentError::NotViewOnce);
        }

        let opened = match message.target {
            Target::User(_) => {
                self.messages
                    .mark_direct_first_viewed(message_id, caller_id, now)
                    .await?
            }
            Target::Group(_) => {
                self.messages
                    .mark_group_first_viewed(message_id, caller_id, now)
                    .await?
            }
        };

        if !opened {
            // Either opened before, or it expired / vanished since it was loaded.
            return match self.messages.find_message(message_id).await? {
                Some(current) if !is_expired(&current, now) => Err(ContentError::AlreadyViewed),
                _ => Err(ContentError::NotFound),
            };
        }

        debug!("Message {message_id} opened by {caller_id}");
        self.notifier.publish(
            Change::MessageOpened {
                message_id,
                viewer_id: caller_id,
                opened_at: now,
            }
            .to(message.sender_id),
        );

        Ok(Message {
            read_at: message.read_at.or(Some(now)),
            first_viewed_at: Some(now),
            ..message
        })
    }

    async fn delete_message(&self, message_id: Uuid, caller_id: Uuid) -> ContentResult<()> {
        let now = self.clock.now();
        let message = self.visible_message(message_id, now).await?;

        let permitted = match message.target {
            Target::User(recipient_id) => {
                caller_id == message.sender_id || caller_id == recipient_id
            }
            Target::Group(_) => caller_id == message.sender_id,
        };
        if !permitted {
            return Err(ContentError::NotAuthorized);
        }

        let audience = self.audience(&message).await?;
        if !self.messages.delete_message(message_id).await? {
            return Err(ContentError::NotFound);
        }
        debug!("Message {message_id} deleted by {caller_id}");

        audience
            .into_iter()
            .chain(std::iter::once(message.sender_id))
            .filter(|user_id| *user_id != caller_id)
            .for_each(|user_id| {
                self.notifier
                    .publish(Change::MessageDeleted { message_id }.to(user_id))
            });

        Ok(())
    }

    async fn get_conversations(&self, current_user_id: Uuid) -> ContentResult<Vec<Conversation>> {
        let now = self.clock.now();
        let messages = self
            .messages
            .list_direct_messages_involving(current_user_id, now)
            .await?;

        Ok(aggregate_conversations(current_user_id, messages, now))
    }
}

/// Folds direct messages into one conversation per counterpart, sorted by
/// last activity (newest first, ties by friend id).
pub fn aggregate_conversations(
    current_user_id: Uuid,
    messages: Vec<Message>,
    now: DateTime<Utc>,
) -> Vec<Conversation> {
    let mut by_friend: HashMap<Uuid, Conversation> = HashMap::new();

    for message in messages {
        if is_expired(&message, now) {
            continue;
        }
        let Some(friend_id) = message.counterpart_of(current_user_id) else {
            continue;
        };
        let unread = message.target == Target::User(current_user_id) && message.read_at.is_none();

        match by_friend.entry(friend_id) {
            Entry::Occupied(mut entry) => {
                let conversation = entry.get_mut();
                if unread {
                    conversation.unread_count += 1;
                }
                if message.created_at >= conversation.last_activity {
                    conversation.last_activity = message.created_at;
                    conversation.last_message = message;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Conversation {
                    friend_id,
                    unread_count: u32::from(unread),
                    last_activity: message.created_at,
                    last_message: message,
                });
            }
        }
    }

    let mut conversations: Vec<Conversation> = by_friend.into_values().collect();
    conversations.sort_by(|a, b| {
        b.last_activity
            .cmp(&a.last_activity)
            .then_with(|| a.friend_id.cmp(&b.friend_id))
    });
    conversations
}
