use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use axum_extra::extract::WithRejection;

use crate::MicroblogError;
use crate::handlers::JsonBody;
use crate::middleware::CurrentUser;
use crate::router::MicroblogState;
use crate::types::user::{RelationshipForm, RelationshipView};

/// POST /relationships -> follow `followed_id`.
pub async fn create(
    State(state): State<MicroblogState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(form), _): JsonBody<RelationshipForm>,
) -> Result<(StatusCode, Json<RelationshipView>), MicroblogError> {
    let rel = state.follow_graph.follow(user.id, form.followed_id).await?;
    let followers_count = state.follow_graph.followers_count(rel.followed_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RelationshipView {
            follower_id: rel.follower_id,
            followed_id: rel.followed_id,
            following: true,
            followers_count,
        }),
    ))
}

/// DELETE /relationships/{id} -> unfollow user `id`.
pub async fn destroy(
    State(state): State<MicroblogState>,
    CurrentUser(user): CurrentUser,
    Path(followed_id): Path<i64>,
) -> Result<Json<RelationshipView>, MicroblogError> {
    state.follow_graph.unfollow(user.id, followed_id).await?;
    let followers_count = state.follow_graph.followers_count(followed_id).await?;
    Ok(Json(RelationshipView {
        follower_id: user.id,
        followed_id,
        following: false,
        followers_count,
    }))
}
