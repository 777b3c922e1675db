use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::db::DbCategory;
use crate::router::VaultState;
use crate::types::{AuthUser, NewCategory};
use crate::VaultError;

pub async fn list(
    State(state): State<VaultState>,
    _user: AuthUser,
) -> Result<Json<Vec<DbCategory>>, VaultError> {
    Ok(Json(state.service.list_categories().await?))
}

pub async fn create(
    State(state): State<VaultState>,
    user: AuthUser,
    Json(input): Json<NewCategory>,
) -> Result<(StatusCode, Json<DbCategory>), VaultError> {
    let category = state.service.create_category(&user, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn destroy(
    State(state): State<VaultState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, VaultError> {
    state.service.delete_category(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
