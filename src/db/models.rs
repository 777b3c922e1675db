use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::crypto::PasswordCodec;
use crate::error::VaultError;

/// Category whose credentials can never be shared.
pub const NON_SHAREABLE_CATEGORY: &str = "Personal";

pub type UserId = i64;
pub type CredentialId = i64;

/// Level granted by a share row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            other => Err(VaultError::validation(
                "permission",
                format!("expected `read` or `write`, got `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored credential. The password is held encrypted and only crosses this
/// type's boundary through [`Credential::password`] and [`Credential::set_password`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Credential {
    pub id: CredentialId,
    pub user_id: UserId,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub title: String,
    pub username: String,
    #[sqlx(rename = "password")]
    password_ciphertext: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Unsaved credential owned by `owner`. `id` stays 0 until inserted.
    pub fn new(
        owner: UserId,
        category: Option<&DbCategory>,
        title: String,
        username: String,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id: owner,
            category_id: category.map(|c| c.id),
            category_name: category.map(|c| c.name.clone()),
            title,
            username,
            password_ciphertext: None,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }

    pub fn is_shareable(&self) -> bool {
        self.category_name.as_deref() != Some(NON_SHAREABLE_CATEGORY)
    }

    pub fn set_category(&mut self, category: Option<&DbCategory>) {
        self.category_id = category.map(|c| c.id);
        self.category_name = category.map(|c| c.name.clone());
    }

    /// Decrypted password, `None` if never set.
    pub fn password(&self, codec: &PasswordCodec) -> Result<Option<String>, VaultError> {
        codec.decode(self.password_ciphertext.as_deref())
    }

    /// Encrypt and store a new password. Absent or empty input keeps the current value.
    pub fn set_password(
        &mut self,
        codec: &PasswordCodec,
        plaintext: Option<&str>,
    ) -> Result<(), VaultError> {
        if let Some(sealed) = codec.encode(plaintext)? {
            self.password_ciphertext = Some(sealed);
        }
        Ok(())
    }

    pub fn password_ciphertext(&self) -> Option<&str> {
        self.password_ciphertext.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct CredentialShare {
    pub id: i64,
    pub credential_id: CredentialId,
    pub shared_by_user_id: UserId,
    pub shared_with_user_id: UserId,
    pub permission: Permission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A share row joined with its grantee, for the owner's "who has access" view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ShareGrantee {
    pub id: i64,
    pub credential_id: CredentialId,
    pub shared_with_user_id: UserId,
    pub shared_with_name: String,
    pub shared_with_email: String,
    pub permission: Permission,
    pub updated_at: DateTime<Utc>,
}

/// A listing row: credential fields without the password, plus the share row
/// (if any) that made it visible to the querying user.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CredentialListing {
    pub id: CredentialId,
    pub user_id: UserId,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub title: String,
    pub username: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub permission: Option<Permission>,
    pub shared_by_user_id: Option<UserId>,
    pub shared_by_name: Option<String>,
}

/// The user behind an API token, with that token's abilities.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenOwner {
    pub token_id: i64,
    pub user: DbUser,
    pub abilities: Vec<String>,
}
