use serde::Serialize;

use crate::db::{DbUser, UserId};
use crate::error::VaultError;

/// Capability strings carried by API tokens. `*` grants all of them.
pub mod abilities {
    pub const ALL: &str = "*";
    pub const CREDENTIALS_CREATE: &str = "credentials:create";
    pub const CREDENTIALS_UPDATE: &str = "credentials:update";
    pub const CREDENTIALS_DELETE: &str = "credentials:delete";
    pub const CREDENTIALS_SHARE: &str = "credentials:share";
    pub const CATEGORIES_CREATE: &str = "categories:create";
    pub const CATEGORIES_DELETE: &str = "categories:delete";
}

/// The authenticated caller. Passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub abilities: Vec<String>,
}

impl AuthUser {
    pub fn new(user: DbUser, abilities: Vec<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            abilities,
        }
    }

    /// Same user with every ability.
    pub fn with_all_abilities(user: DbUser) -> Self {
        Self::new(user, vec![abilities::ALL.to_string()])
    }

    pub fn can(&self, ability: &str) -> bool {
        self.abilities
            .iter()
            .any(|a| a == abilities::ALL || a == ability)
    }

    pub fn require(&self, ability: &str) -> Result<(), VaultError> {
        if self.can(ability) {
            Ok(())
        } else {
            Err(VaultError::forbidden(format!(
                "token lacks the `{ability}` ability"
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<DbUser> for UserView {
    fn from(u: DbUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

impl From<&AuthUser> for UserView {
    fn from(u: &AuthUser) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}
