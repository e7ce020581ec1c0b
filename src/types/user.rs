use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::DbUser;
use crate::types::{Paged, micropost::MicropostView};

/// Signup and profile-edit payload. Missing fields deserialize as empty so that
/// they surface as validation messages rather than JSON rejections.
/// Carries no `admin` field, so the flag cannot be mass-assigned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&DbUser> for UserView {
    fn from(u: &DbUser) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            admin: u.admin,
            created_at: u.created_at,
        }
    }
}

impl From<DbUser> for UserView {
    fn from(u: DbUser) -> Self {
        Self::from(&u)
    }
}

/// What the account owner sees about themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbUser> for AccountView {
    fn from(u: DbUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            admin: u.admin,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub message: String,
    pub account: AccountView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub user: UserView,
    pub microposts: Paged<MicropostView>,
    pub following_count: i64,
    pub followers_count: i64,
    /// Whether the signed-in viewer follows this user; absent for anonymous viewers
    /// and for the user's own profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RelationshipForm {
    pub followed_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipView {
    pub follower_id: i64,
    pub followed_id: i64,
    pub following: bool,
    pub followers_count: i64,
}

/// One page of a user's followed users or followers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowListView {
    pub title: String,
    pub user: UserView,
    pub users: Paged<UserView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
