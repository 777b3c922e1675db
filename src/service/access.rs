use serde::Serialize;

use crate::db::{Credential, CredentialShare, Permission, UserId};

/// What a user may do with a credential. Ordered `None < Read < Write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    None,
    Read,
    Write,
}

impl From<Permission> for AccessLevel {
    fn from(p: Permission) -> Self {
        match p {
            Permission::Read => AccessLevel::Read,
            Permission::Write => AccessLevel::Write,
        }
    }
}

/// Owner gets `Write`; otherwise the level of the user's share row, if any.
///
/// `share` must be the row for `(credential.id, user)`; a row for another pair
/// grants nothing.
pub fn resolve(user: UserId, credential: &Credential, share: Option<&CredentialShare>) -> AccessLevel {
    if credential.is_owned_by(user) {
        return AccessLevel::Write;
    }
    match share {
        Some(s) if s.credential_id == credential.id && s.shared_with_user_id == user => {
            s.permission.into()
        }
        _ => AccessLevel::None,
    }
}
