use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::{WithRejection, cookie::PrivateCookieJar};
use tracing::info;

use crate::middleware::{CurrentUser, auth::remember};
use crate::router::MicroblogState;
use crate::types::micropost::MicropostView;
use crate::types::user::{
    AccountForm, AccountResponse, AccountView, FollowListView, MessageResponse, ProfileView,
    UserView,
};
use crate::MicroblogError;
use crate::handlers::JsonBody;
use crate::types::{Page, PageQuery, Paged};

/// GET /users -> paginated list of all users.
pub async fn index(
    State(state): State<MicroblogState>,
    _viewer: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<UserView>>, MicroblogError> {
    let page = Page::from_query(query, state.per_page);
    let users = state.accounts.list(page).await?;
    Ok(Json(users.map(UserView::from)))
}

/// POST /users -> signup; the new account is signed in straight away.
pub async fn create(
    State(state): State<MicroblogState>,
    jar: PrivateCookieJar,
    WithRejection(Json(form), _): JsonBody<AccountForm>,
) -> Result<(StatusCode, PrivateCookieJar, Json<AccountResponse>), MicroblogError> {
    let session = state.accounts.signup(&form).await?;
    let jar = remember(jar, session.remember_token, state.insecure_cookie);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AccountResponse {
            message: "Welcome to the Sample App!".to_string(),
            account: AccountView::from(session.user),
        }),
    ))
}

/// GET /users/{id} -> profile with the first page of microposts and follow counts.
pub async fn show(
    State(state): State<MicroblogState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileView>, MicroblogError> {
    let user = state.accounts.find(id).await?;
    let page = Page::from_query(query, state.per_page);
    let microposts = state.microposts.of_user(id, page).await?;
    let following = match viewer {
        Some(viewer) if viewer.id() != id => {
            Some(state.follow_graph.is_following(viewer.id(), id).await?)
        }
        _ => None,
    };

    Ok(Json(ProfileView {
        user: UserView::from(user),
        microposts: microposts.map(MicropostView::from),
        following_count: state.follow_graph.following_count(id).await?,
        followers_count: state.follow_graph.followers_count(id).await?,
        following,
    }))
}

/// PATCH /users/{id} -> edit one's own profile.
pub async fn update(
    State(state): State<MicroblogState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
    WithRejection(Json(form), _): JsonBody<AccountForm>,
) -> Result<Json<AccountResponse>, MicroblogError> {
    if viewer.id != id {
        info!(viewer_id = viewer.id, target_id = id, "profile edit refused");
        return Err(MicroblogError::Forbidden);
    }
    let user = state.accounts.update_profile(id, &form).await?;
    Ok(Json(AccountResponse {
        message: "Profile updated".to_string(),
        account: AccountView::from(user),
    }))
}

/// DELETE /users/{id} -> admin removes another user.
pub async fn destroy(
    State(state): State<MicroblogState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, MicroblogError> {
    state.accounts.delete(&viewer, id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted.".to_string(),
    }))
}

/// GET /users/{id}/following
pub async fn following(
    State(state): State<MicroblogState>,
    _viewer: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FollowListView>, MicroblogError> {
    let user = state.accounts.find(id).await?;
    let page = Page::from_query(query, state.per_page);
    let users = state.follow_graph.followed_users(id, page).await?;
    Ok(Json(FollowListView {
        title: "Following".to_string(),
        user: UserView::from(user),
        users: users.map(UserView::from),
    }))
}

/// GET /users/{id}/followers
pub async fn followers(
    State(state): State<MicroblogState>,
    _viewer: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FollowListView>, MicroblogError> {
    let user = state.accounts.find(id).await?;
    let page = Page::from_query(query, state.per_page);
    let users = state.follow_graph.followers(id, page).await?;
    Ok(Json(FollowListView {
        title: "Followers".to_string(),
        user: UserView::from(user),
        users: users.map(UserView::from),
    }))
}
