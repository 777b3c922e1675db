use axum::{
    Json,
    extract::{Path, State},
};

use crate::db::{CredentialId, ShareGrantee};
use crate::router::VaultState;
use crate::types::{AuthUser, ShareRequest, ShareView};
use crate::VaultError;

/// GET /credentials/{id}/shares -> grantees and their permission (owner only).
pub async fn list(
    State(state): State<VaultState>,
    user: AuthUser,
    Path(id): Path<CredentialId>,
) -> Result<Json<Vec<ShareGrantee>>, VaultError> {
    Ok(Json(state.service.list_shares(&user, id).await?))
}

/// POST /credentials/{id}/shares -> grant or change a user's access.
pub async fn grant(
    State(state): State<VaultState>,
    user: AuthUser,
    Path(id): Path<CredentialId>,
    Json(req): Json<ShareRequest>,
) -> Result<Json<ShareView>, VaultError> {
    let share = state
        .service
        .grant_share(&user, id, req.shared_with_user_id, &req.permission)
        .await?;
    Ok(Json(share.into()))
}
