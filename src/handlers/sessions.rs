use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::{WithRejection, cookie::PrivateCookieJar};

use crate::MicroblogError;
use crate::handlers::JsonBody;
use crate::middleware::{
    CurrentUser,
    auth::{forget, remember},
};
use crate::router::MicroblogState;
use crate::types::user::{AccountResponse, AccountView, SigninForm};

/// POST /sessions -> sign in with email and password.
pub async fn create(
    State(state): State<MicroblogState>,
    jar: PrivateCookieJar,
    WithRejection(Json(form), _): JsonBody<SigninForm>,
) -> Result<(PrivateCookieJar, Json<AccountResponse>), MicroblogError> {
    let session = state.accounts.sign_in(&form.email, &form.password).await?;
    let jar = remember(jar, session.remember_token, state.insecure_cookie);
    Ok((
        jar,
        Json(AccountResponse {
            message: "Signed in".to_string(),
            account: AccountView::from(session.user),
        }),
    ))
}

/// DELETE /sessions -> sign out and drop the cookie.
pub async fn destroy(
    State(state): State<MicroblogState>,
    CurrentUser(user): CurrentUser,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), MicroblogError> {
    state.accounts.sign_out(user.id).await?;
    Ok((forget(jar), StatusCode::NO_CONTENT))
}
