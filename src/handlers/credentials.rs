use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::db::CredentialId;
use crate::router::VaultState;
use crate::types::{AuthUser, CredentialDetail, CredentialPatch, CredentialSummary, NewCredential};
use crate::VaultError;

/// GET /credentials -> owned and shared-with-me credentials, passwords omitted.
pub async fn list(
    State(state): State<VaultState>,
    user: AuthUser,
) -> Result<Json<Vec<CredentialSummary>>, VaultError> {
    Ok(Json(state.service.list_credentials(&user).await?))
}

/// GET /credentials/shared -> only credentials other users shared with the caller.
pub async fn shared_with_me(
    State(state): State<VaultState>,
    user: AuthUser,
) -> Result<Json<Vec<CredentialSummary>>, VaultError> {
    Ok(Json(state.service.list_shared_with_me(&user).await?))
}

pub async fn create(
    State(state): State<VaultState>,
    user: AuthUser,
    Json(input): Json<NewCredential>,
) -> Result<(StatusCode, Json<CredentialDetail>), VaultError> {
    let created = state.service.create_credential(&user, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /credentials/{id} -> detail with the decrypted password.
pub async fn show(
    State(state): State<VaultState>,
    user: AuthUser,
    Path(id): Path<CredentialId>,
) -> Result<Json<CredentialDetail>, VaultError> {
    Ok(Json(state.service.get_credential(&user, id).await?))
}

pub async fn update(
    State(state): State<VaultState>,
    user: AuthUser,
    Path(id): Path<CredentialId>,
    Json(patch): Json<CredentialPatch>,
) -> Result<Json<CredentialDetail>, VaultError> {
    Ok(Json(state.service.update_credential(&user, id, patch).await?))
}

pub async fn destroy(
    State(state): State<VaultState>,
    user: AuthUser,
    Path(id): Path<CredentialId>,
) -> Result<StatusCode, VaultError> {
    state.service.delete_credential(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
