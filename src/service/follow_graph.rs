use tracing::{debug, info};

use crate::db::Storage;
use crate::db::models::{DbRelationship, DbUser};
use crate::error::MicroblogError;
use crate::types::{Page, Paged, ValidationErrors};

/// Directed follow edges between users.
#[derive(Clone)]
pub struct FollowGraph {
    storage: Storage,
}

impl FollowGraph {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create the edge `follower_id -> followed_id`.
    ///
    /// Fails with `AlreadyFollowing` when the edge exists, `NotFound` when the
    /// followed user does not, and a validation error on a self-follow.
    pub async fn follow(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<DbRelationship, MicroblogError> {
        if follower_id == followed_id {
            return Err(ValidationErrors::single("followed", "can't be the follower").into());
        }
        if self.storage.get_user(followed_id).await?.is_none() {
            return Err(MicroblogError::NotFound("User"));
        }
        let rel = self
            .storage
            .insert_relationship(follower_id, followed_id)
            .await?;
        info!(follower_id, followed_id, "follow");
        Ok(rel)
    }

    /// Remove the edge; `NotFollowing` if there was none.
    pub async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<(), MicroblogError> {
        if !self
            .storage
            .delete_relationship(follower_id, followed_id)
            .await?
        {
            debug!(follower_id, followed_id, "unfollow without edge");
            return Err(MicroblogError::NotFollowing {
                follower_id,
                followed_id,
            });
        }
        info!(follower_id, followed_id, "unfollow");
        Ok(())
    }

    pub async fn is_following(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<bool, MicroblogError> {
        self.storage
            .relationship_exists(follower_id, followed_id)
            .await
    }

    pub async fn followed_users(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Paged<DbUser>, MicroblogError> {
        let users = self.storage.followed_users(user_id, page).await?;
        let total = self.storage.count_followed(user_id).await?;
        Ok(Paged::new(users, page, total))
    }

    pub async fn followers(&self, user_id: i64, page: Page) -> Result<Paged<DbUser>, MicroblogError> {
        let users = self.storage.followers(user_id, page).await?;
        let total = self.storage.count_followers(user_id).await?;
        Ok(Paged::new(users, page, total))
    }

    pub async fn following_count(&self, user_id: i64) -> Result<i64, MicroblogError> {
        self.storage.count_followed(user_id).await
    }

    pub async fn followers_count(&self, user_id: i64) -> Result<i64, MicroblogError> {
        self.storage.count_followers(user_id).await
    }
}
