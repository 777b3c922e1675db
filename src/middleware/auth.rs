use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use tracing::debug;

use crate::error::VaultError;
use crate::router::VaultState;
use crate::types::AuthUser;

/// Resolve `Authorization: Bearer <token>` to the calling user.
/// Missing, malformed and unknown tokens all reject with 401.
impl FromRequestParts<VaultState> for AuthUser {
    type Rejection = VaultError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &VaultState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    debug!(reason = %rejection, "missing bearer token");
                    VaultError::Unauthenticated
                })?;
        state.service.authenticate(bearer.token()).await
    }
}
