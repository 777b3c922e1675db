use axum::{Json, extract::State};

use crate::router::VaultState;
use crate::types::{AuthUser, UserView};
use crate::VaultError;

/// GET /user -> the authenticated user.
pub async fn current_user(user: AuthUser) -> Json<UserView> {
    Json(UserView::from(&user))
}

/// GET /users -> everyone the caller could share a credential with.
pub async fn share_targets(
    State(state): State<VaultState>,
    user: AuthUser,
) -> Result<Json<Vec<UserView>>, VaultError> {
    Ok(Json(state.service.list_share_targets(&user).await?))
}
