use axum::{
    Router,
    extract::FromRef,
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::Key;

use crate::db::Storage;
use crate::handlers::{microposts, relationships, sessions, users};
use crate::service::{Accounts, FollowGraph, Microposts};

#[derive(Clone)]
pub struct MicroblogState {
    pub accounts: Accounts,
    pub follow_graph: FollowGraph,
    pub microposts: Microposts,
    pub key: Key,
    pub insecure_cookie: bool,
    pub per_page: u32,
}

impl MicroblogState {
    pub fn new(storage: Storage, key: Key, insecure_cookie: bool, per_page: u32) -> Self {
        Self {
            accounts: Accounts::new(storage.clone()),
            follow_graph: FollowGraph::new(storage.clone()),
            microposts: Microposts::new(storage),
            key,
            insecure_cookie,
            per_page: per_page.max(1),
        }
    }
}

impl FromRef<MicroblogState> for Key {
    fn from_ref(state: &MicroblogState) -> Self {
        state.key.clone()
    }
}

pub fn microblog_router(state: MicroblogState) -> Router {
    Router::new()
        .route("/users", get(users::index).post(users::create))
        .route(
            "/users/{id}",
            get(users::show).patch(users::update).delete(users::destroy),
        )
        .route("/users/{id}/following", get(users::following))
        .route("/users/{id}/followers", get(users::followers))
        .route("/sessions", post(sessions::create).delete(sessions::destroy))
        .route("/microposts", post(microposts::create))
        .route("/microposts/{id}", delete(microposts::destroy))
        .route("/feed", get(microposts::feed))
        .route("/relationships", post(relationships::create))
        .route("/relationships/{id}", delete(relationships::destroy))
        .with_state(state)
}
