use chrono::Utc;
use tracing::info;

use crate::db::Storage;
use crate::db::models::{DbFeedItem, DbMicropost};
use crate::error::MicroblogError;
use crate::types::{Page, Paged, ValidationErrors};

pub const CONTENT_MAX_CHARS: usize = 140;

pub fn validate_content(content: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if content.trim().is_empty() {
        errors.add("content", "can't be blank");
    } else if content.chars().count() > CONTENT_MAX_CHARS {
        errors.add(
            "content",
            format!("is too long (maximum is {CONTENT_MAX_CHARS} characters)"),
        );
    }
    errors
}

/// Posting, deleting and reading microposts, including the feed.
#[derive(Clone)]
pub struct Microposts {
    storage: Storage,
}

impl Microposts {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn post(&self, user_id: i64, content: &str) -> Result<DbMicropost, MicroblogError> {
        validate_content(content).into_result()?;
        let micropost = self
            .storage
            .insert_micropost(user_id, content, Utc::now())
            .await?;
        info!(user_id, micropost_id = micropost.id, "micropost created");
        Ok(micropost)
    }

    /// Delete `id` if `user_id` owns it. Someone else's post is indistinguishable
    /// from a missing one.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), MicroblogError> {
        if !self.storage.delete_micropost(id, user_id).await? {
            return Err(MicroblogError::NotFound("Micropost"));
        }
        info!(user_id, micropost_id = id, "micropost deleted");
        Ok(())
    }

    pub async fn of_user(&self, user_id: i64, page: Page) -> Result<Paged<DbMicropost>, MicroblogError> {
        let posts = self.storage.microposts_by_user(user_id, page).await?;
        let total = self.storage.count_microposts(user_id).await?;
        Ok(Paged::new(posts, page, total))
    }

    /// Own posts plus posts of followed users, newest first.
    pub async fn feed(&self, user_id: i64, page: Page) -> Result<Paged<DbFeedItem>, MicroblogError> {
        let items = self.storage.feed(user_id, page).await?;
        let total = self.storage.count_feed(user_id).await?;
        Ok(Paged::new(items, page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_limits() {
        assert!(validate_content("Lorem ipsum").is_empty());
        assert!(validate_content(&"a".repeat(140)).is_empty());
        assert_eq!(
            validate_content(&"a".repeat(141)).full_messages(),
            vec!["Content is too long (maximum is 140 characters)"]
        );
        assert_eq!(
            validate_content("   ").full_messages(),
            vec!["Content can't be blank"]
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(validate_content(&"é".repeat(140)).is_empty());
    }
}
