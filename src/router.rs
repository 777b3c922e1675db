use axum::{
    Router,
    routing::{delete, get},
};

use crate::handlers::{categories, credentials, shares, users};
use crate::service::VaultService;

#[derive(Clone)]
pub struct VaultState {
    pub service: VaultService,
}

impl VaultState {
    pub fn new(service: VaultService) -> Self {
        Self { service }
    }
}

pub fn vault_router(state: VaultState) -> Router {
    Router::new()
        .route("/user", get(users::current_user))
        .route("/users", get(users::share_targets))
        .route(
            "/credentials",
            get(credentials::list).post(credentials::create),
        )
        .route("/credentials/shared", get(credentials::shared_with_me))
        .route(
            "/credentials/{id}",
            get(credentials::show)
                .patch(credentials::update)
                .delete(credentials::destroy),
        )
        .route(
            "/credentials/{id}/shares",
            get(shares::list).post(shares::grant),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route("/categories/{id}", delete(categories::destroy))
        .with_state(state)
}
