use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use time::Duration;
use tracing::debug;

use crate::config::COOKIE_NAME;
use crate::db::models::DbUser;
use crate::error::MicroblogError;
use crate::router::MicroblogState;

/// How long a remember cookie lives: effectively permanent.
const REMEMBER_FOR: Duration = Duration::days(20 * 365);

/// The user identified by the request's remember-token cookie.
///
/// As a plain extractor it rejects anonymous requests with 401; as
/// `Option<CurrentUser>` it lets them through as `None`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub DbUser);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

async fn resolve(
    parts: &Parts,
    state: &MicroblogState,
) -> Result<Option<DbUser>, MicroblogError> {
    let jar = PrivateCookieJar::from_headers(&parts.headers, state.key.clone());
    let Some(token) = jar.get(COOKIE_NAME).map(|c| c.value().to_owned()) else {
        return Ok(None);
    };
    let user = state.accounts.current_user(&token).await?;
    if user.is_none() {
        debug!("remember token did not match any user");
    }
    Ok(user)
}

impl FromRequestParts<MicroblogState> for CurrentUser {
    type Rejection = MicroblogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MicroblogState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or(MicroblogError::Unauthorized)
    }
}

impl OptionalFromRequestParts<MicroblogState> for CurrentUser {
    type Rejection = MicroblogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &MicroblogState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(resolve(parts, state).await?.map(CurrentUser))
    }
}

/// Store the raw remember token in the (encrypted) cookie jar.
pub fn remember(jar: PrivateCookieJar, token: String, insecure: bool) -> PrivateCookieJar {
    jar.add(
        Cookie::build(Cookie::new(COOKIE_NAME, token))
            .path("/")
            .http_only(true)
            .secure(!insecure)
            .same_site(SameSite::Lax)
            .max_age(REMEMBER_FOR)
            .build(),
    )
}

pub fn forget(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(
        Cookie::build(Cookie::new(COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}
