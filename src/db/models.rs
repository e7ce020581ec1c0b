use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `users` row. `remember_token` holds the digest, never the raw cookie value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub remember_token: Option<String>,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbMicropost {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A micropost joined with its author's name, as returned by the feed query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbFeedItem {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbRelationship {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a user; the id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub remember_token: String,
    pub admin: bool,
}

/// Profile fields replaced by an update.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
    pub password_digest: String,
}
