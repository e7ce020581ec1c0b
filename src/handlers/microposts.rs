use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use axum_extra::extract::WithRejection;

use crate::MicroblogError;
use crate::handlers::JsonBody;
use crate::middleware::CurrentUser;
use crate::router::MicroblogState;
use crate::types::micropost::{FeedItemView, MicropostForm, MicropostView};
use crate::types::{Page, PageQuery, Paged};

pub async fn create(
    State(state): State<MicroblogState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(form), _): JsonBody<MicropostForm>,
) -> Result<(StatusCode, Json<MicropostView>), MicroblogError> {
    let micropost = state.microposts.post(user.id, &form.content).await?;
    Ok((StatusCode::CREATED, Json(micropost.into())))
}

pub async fn destroy(
    State(state): State<MicroblogState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, MicroblogError> {
    state.microposts.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /feed -> the signed-in user's feed.
pub async fn feed(
    State(state): State<MicroblogState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<FeedItemView>>, MicroblogError> {
    let page = Page::from_query(query, state.per_page);
    let items = state.microposts.feed(user.id, page).await?;
    Ok(Json(items.map(FeedItemView::from)))
}
