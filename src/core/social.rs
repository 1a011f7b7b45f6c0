//! Friend requests, blocking and groups.

use crate::core::errors::ContentError;
use crate::core::traits::{Clock, ContentResult, SocialService};
use crate::infrastructure::entities::{Friendship, FriendshipStatus, Group};
use crate::infrastructure::traits::SocialGraphRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::debug;
use std::collections::BTreeSet;
use uuid::Uuid;

#[injectable(SocialService)]
pub struct MySocialService {
    social: Ref<dyn SocialGraphRepository>,
    clock: Ref<dyn Clock>,
}

impl MySocialService {
    pub fn new(social: Ref<dyn SocialGraphRepository>, clock: Ref<dyn Clock>) -> Self {
        Self { social, clock }
    }

    async fn edge_status(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
    ) -> ContentResult<Option<FriendshipStatus>> {
        Ok(self
            .social
            .find_edge(user_id, friend_id)
            .await?
            .map(|edge| edge.status))
    }
}

#[async_trait]
impl SocialService for MySocialService {
    async fn send_friend_request(
        &self,
        caller_id: Uuid,
        target_id: Uuid,
    ) -> ContentResult<FriendshipStatus> {
        if caller_id == target_id {
            return Err(ContentError::InvalidTarget);
        }

        let reverse = self.edge_status(target_id, caller_id).await?;
        if reverse == Some(FriendshipStatus::Blocked) {
            return Err(ContentError::InvalidTarget);
        }

        match self.edge_status(caller_id, target_id).await? {
            Some(FriendshipStatus::Blocked) => return Err(ContentError::InvalidTarget),
            Some(FriendshipStatus::Accepted) => return Ok(FriendshipStatus::Accepted),
            Some(FriendshipStatus::Pending) => return Ok(FriendshipStatus::Pending),
            None => {}
        }

        let now = self.clock.now();
        if reverse == Some(FriendshipStatus::Pending)
            && self.social.accept_pending(target_id, caller_id, now).await?
        {
            debug!("Crossed friend requests between {caller_id} and {target_id}, accepted");
            return Ok(FriendshipStatus::Accepted);
        }

        self.social.insert_pending(caller_id, target_id, now).await?;
        debug!("Friend request from {caller_id} to {target_id}");
        Ok(FriendshipStatus::Pending)
    }

    async fn accept_friend_request(
        &self,
        caller_id: Uuid,
        requester_id: Uuid,
    ) -> ContentResult<()> {
        if caller_id == requester_id {
            return Err(ContentError::InvalidTarget);
        }

        if !self
            .social
            .accept_pending(requester_id, caller_id, self.clock.now())
            .await?
        {
            return Err(ContentError::NotFound);
        }
        debug!("{caller_id} accepted the friend request of {requester_id}");
        Ok(())
    }

    async fn reject_friend_request(
        &self,
        caller_id: Uuid,
        requester_id: Uuid,
    ) -> ContentResult<()> {
        if !self
            .social
            .delete_edge(requester_id, caller_id, FriendshipStatus::Pending)
            .await?
        {
            return Err(ContentError::NotFound);
        }
        Ok(())
    }

    async fn remove_friend(&self, caller_id: Uuid, friend_id: Uuid) -> ContentResult<()> {
        if self.social.delete_pair(caller_id, friend_id).await? == 0 {
            return Err(ContentError::NotFound);
        }
        debug!("{caller_id} removed {friend_id}");
        Ok(())
    }

    async fn block_user(&self, caller_id: Uuid, target_id: Uuid) -> ContentResult<()> {
        if caller_id == target_id {
            return Err(ContentError::InvalidTarget);
        }

        self.social
            .block(caller_id, target_id, self.clock.now())
            .await?;
        debug!("{caller_id} blocked {target_id}");
        Ok(())
    }

    async fn list_friends(&self, caller_id: Uuid) -> ContentResult<Vec<Uuid>> {
        Ok(self.social.list_friend_ids(caller_id).await?)
    }

    async fn list_pending_requests(&self, caller_id: Uuid) -> ContentResult<Vec<Friendship>> {
        Ok(self.social.list_incoming_pending(caller_id).await?)
    }

    async fn create_group(
        &self,
        owner_id: Uuid,
        name: String,
        member_ids: Vec<Uuid>,
    ) -> ContentResult<Group> {
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(ContentError::EmptyContent);
        }

        let members: BTreeSet<Uuid> = member_ids
            .into_iter()
            .filter(|member_id| *member_id != owner_id)
            .collect();
        for member_id in &members {
            if !self.social.are_mutual_friends(owner_id, *member_id).await? {
                return Err(ContentError::InvalidTarget);
            }
        }

        let group = Group {
            id: Uuid::new_v4(),
            name,
            owner_id,
            created_at: self.clock.now(),
        };
        let all_members: Vec<Uuid> = std::iter::once(owner_id).chain(members).collect();

        self.social.create_group(&group, &all_members).await?;
        debug!(
            "Group {} created by {} with {} members",
            group.id,
            owner_id,
            all_members.len()
        );
        Ok(group)
    }

    async fn list_groups(&self, caller_id: Uuid) -> ContentResult<Vec<Group>> {
        Ok(self.social.list_groups_for(caller_id).await?)
    }
}
