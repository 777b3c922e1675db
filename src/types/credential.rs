use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{
    Credential, CredentialId, CredentialListing, CredentialShare, Permission, UserId,
};
use crate::service::access::AccessLevel;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCredential {
    pub title: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Partial update. Absent fields are left as stored; an empty password is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialPatch {
    pub title: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

fn default_permission() -> String {
    Permission::Read.as_str().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareRequest {
    pub shared_with_user_id: UserId,
    #[serde(default = "default_permission")]
    pub permission: String,
}

/// How the caller came to see a credential.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SharedInfo {
    pub shared_by_user_id: UserId,
    pub shared_by_name: String,
    pub permission: Permission,
}

/// Full view of one credential including the decrypted password.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDetail {
    pub id: CredentialId,
    pub owner_id: UserId,
    pub category_id: Option<i64>,
    pub category: Option<String>,
    pub title: String,
    pub username: String,
    pub password: Option<String>,
    pub description: Option<String>,
    pub access: AccessLevel,
    pub shared: Option<SharedInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialDetail {
    pub fn new(
        cred: Credential,
        password: Option<String>,
        access: AccessLevel,
        shared: Option<SharedInfo>,
    ) -> Self {
        Self {
            id: cred.id,
            owner_id: cred.user_id,
            category_id: cred.category_id,
            category: cred.category_name,
            title: cred.title,
            username: cred.username,
            password,
            description: cred.description,
            access,
            shared,
            created_at: cred.created_at,
            updated_at: cred.updated_at,
        }
    }
}

/// Listing row. Never carries the password.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub id: CredentialId,
    pub owner_id: UserId,
    pub category_id: Option<i64>,
    pub category: Option<String>,
    pub title: String,
    pub username: String,
    pub description: Option<String>,
    pub shared_info: String,
    pub shared_by: Option<String>,
    pub permission: Option<Permission>,
    pub access: AccessLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialSummary {
    pub fn from_listing(row: CredentialListing, viewer: UserId) -> Self {
        let owned = row.user_id == viewer;
        let shared_info = match (&row.shared_by_name, owned) {
            (Some(name), false) => format!("Shared by {name}"),
            _ => "Owner".to_string(),
        };
        let access = if owned {
            AccessLevel::Write
        } else {
            row.permission.map(AccessLevel::from).unwrap_or(AccessLevel::None)
        };
        Self {
            id: row.id,
            owner_id: row.user_id,
            category_id: row.category_id,
            category: row.category_name,
            title: row.title,
            username: row.username,
            description: row.description,
            shared_info,
            shared_by: if owned { None } else { row.shared_by_name },
            permission: if owned { None } else { row.permission },
            access,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareView {
    pub id: i64,
    pub credential_id: CredentialId,
    pub shared_by_user_id: UserId,
    pub shared_with_user_id: UserId,
    pub permission: Permission,
    pub updated_at: DateTime<Utc>,
}

impl From<CredentialShare> for ShareView {
    fn from(s: CredentialShare) -> Self {
        Self {
            id: s.id,
            credential_id: s.credential_id,
            shared_by_user_id: s.shared_by_user_id,
            shared_with_user_id: s.shared_with_user_id,
            permission: s.permission,
            updated_at: s.updated_at,
        }
    }
}
