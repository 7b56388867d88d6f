// naturequest-server/src/extract.rs

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use naturequest_common::models::User;
use naturequest_common::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves `Authorization: Bearer <token>` to the calling user.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError(Error::Auth("missing Authorization header".into())))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError(Error::Auth("expected a bearer token".into())))?;

        let user = state.auth.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}
