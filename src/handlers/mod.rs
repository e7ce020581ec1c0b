use axum::Json;
use axum_extra::extract::WithRejection;

use crate::MicroblogError;

pub mod microposts;
pub mod relationships;
pub mod sessions;
pub mod users;

/// JSON request body whose rejections use the [`MicroblogError`] envelope.
pub type JsonBody<T> = WithRejection<Json<T>, MicroblogError>;
