use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{DbFeedItem, DbMicropost};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MicropostForm {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MicropostView {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbMicropost> for MicropostView {
    fn from(m: DbMicropost) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItemView {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbFeedItem> for FeedItemView {
    fn from(f: DbFeedItem) -> Self {
        Self {
            id: f.id,
            user_id: f.user_id,
            user_name: f.user_name,
            content: f.content,
            created_at: f.created_at,
        }
    }
}
