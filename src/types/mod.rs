//! Request and response shapes shared by the service and HTTP layers.

pub mod category;
pub mod credential;
pub mod user;

pub use category::NewCategory;
pub use credential::{
    CredentialDetail, CredentialPatch, CredentialSummary, NewCredential, ShareRequest,
    ShareView, SharedInfo,
};
pub use user::{AuthUser, UserView, abilities};
