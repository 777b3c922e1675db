use crate::config::Config;
use crate::crypto::PasswordCodec;
use crate::db::{
    Credential, CredentialId, CredentialShare, DbCategory, Permission, ShareGrantee, UserId,
    VaultStorage,
};
use crate::error::VaultError;
use crate::service::access::{AccessLevel, resolve};
use crate::types::{
    AuthUser, CredentialDetail, CredentialPatch, CredentialSummary, NewCategory, NewCredential,
    SharedInfo, UserView, abilities,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

const MAX_TEXT_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// SHA-256 hex digest under which API tokens are stored.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Credential lifecycle, sharing and category operations. Every call takes the
/// authenticated caller explicitly and checks access before touching data.
#[derive(Clone)]
pub struct VaultService {
    storage: VaultStorage,
    codec: PasswordCodec,
}

impl VaultService {
    pub fn new(storage: VaultStorage, codec: PasswordCodec) -> Self {
        Self { storage, codec }
    }

    /// Connect, migrate and optionally seed according to `cfg`.
    pub async fn open(cfg: &Config) -> Result<Self, VaultError> {
        let codec = PasswordCodec::from_base64_key(&cfg.encryption_key)?;
        let storage = VaultStorage::connect(&cfg.database_url).await?;
        storage.init_schema().await?;
        if cfg.seed_categories {
            storage.seed_default_categories().await?;
        }
        Ok(Self::new(storage, codec))
    }

    pub fn storage(&self) -> &VaultStorage {
        &self.storage
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, VaultError> {
        let owner = self
            .storage
            .find_token_owner(&hash_token(token))
            .await?
            .ok_or(VaultError::Unauthenticated)?;
        if let Err(e) = self.storage.touch_token(owner.token_id).await {
            warn!(token_id = owner.token_id, error = %e, "failed to record token use");
        }
        Ok(AuthUser::new(owner.user, owner.abilities))
    }

    // ─── access ─────────────────────────────────────────────────────────────

    async fn load(&self, id: CredentialId) -> Result<Credential, VaultError> {
        self.storage
            .get_credential(id)
            .await?
            .ok_or(VaultError::NotFound {
                resource: "credential",
                id,
            })
    }

    pub async fn share_for(
        &self,
        credential_id: CredentialId,
        user: UserId,
    ) -> Result<Option<CredentialShare>, VaultError> {
        self.storage.share_for(credential_id, user).await
    }

    async fn resolve_loaded(
        &self,
        user: &AuthUser,
        cred: &Credential,
    ) -> Result<(AccessLevel, Option<CredentialShare>), VaultError> {
        if cred.is_owned_by(user.id) {
            return Ok((AccessLevel::Write, None));
        }
        let share = self.share_for(cred.id, user.id).await?;
        Ok((resolve(user.id, cred, share.as_ref()), share))
    }

    /// Access level of `user` on credential `id`. Fails with not-found for a missing credential.
    pub async fn access_level(
        &self,
        user: &AuthUser,
        id: CredentialId,
    ) -> Result<AccessLevel, VaultError> {
        let cred = self.load(id).await?;
        let (level, _) = self.resolve_loaded(user, &cred).await?;
        Ok(level)
    }

    async fn load_with_access(
        &self,
        user: &AuthUser,
        id: CredentialId,
        required: AccessLevel,
    ) -> Result<(Credential, AccessLevel, Option<CredentialShare>), VaultError> {
        let cred = self.load(id).await?;
        let (level, share) = self.resolve_loaded(user, &cred).await?;
        if level < required {
            warn!(
                user_id = user.id,
                credential_id = id,
                ?level,
                ?required,
                "credential access denied"
            );
            let action = if required == AccessLevel::Write {
                "modify"
            } else {
                "view"
            };
            return Err(VaultError::forbidden(format!(
                "not allowed to {action} credential {id}"
            )));
        }
        Ok((cred, level, share))
    }

    fn reveal_password(&self, cred: &Credential) -> Result<Option<String>, VaultError> {
        cred.password(&self.codec).inspect_err(|e| {
            error!(credential_id = cred.id, error = %e, "failed to decode stored password");
        })
    }

    async fn detail(
        &self,
        cred: Credential,
        level: AccessLevel,
        share: Option<CredentialShare>,
    ) -> Result<CredentialDetail, VaultError> {
        let password = self.reveal_password(&cred)?;
        let shared = match share {
            Some(s) => {
                let grantor = self.storage.get_user(s.shared_by_user_id).await?;
                Some(SharedInfo {
                    shared_by_user_id: s.shared_by_user_id,
                    shared_by_name: grantor.map(|u| u.name).unwrap_or_else(|| "Unknown".to_string()),
                    permission: s.permission,
                })
            }
            None => None,
        };
        Ok(CredentialDetail::new(cred, password, level, shared))
    }

    // ─── credentials ────────────────────────────────────────────────────────

    pub async fn create_credential(
        &self,
        user: &AuthUser,
        input: NewCredential,
    ) -> Result<CredentialDetail, VaultError> {
        user.require(abilities::CREDENTIALS_CREATE)?;

        let title = required_text("title", &input.title, MAX_TEXT_LEN)?;
        let username = required_text("username", &input.username, MAX_TEXT_LEN)?;
        let description = optional_text("description", input.description, MAX_DESCRIPTION_LEN)?;
        if let Some(p) = input.password.as_deref() {
            check_len("password", p, MAX_TEXT_LEN)?;
        }
        let category = match input.category_id {
            Some(id) => Some(self.category(id).await?),
            None => None,
        };

        let mut cred = Credential::new(user.id, category.as_ref(), title, username, description);
        cred.set_password(&self.codec, input.password.as_deref())?;
        let cred = self.storage.insert_credential(&cred).await?;

        info!(user_id = user.id, credential_id = cred.id, "credential created");
        self.detail(cred, AccessLevel::Write, None).await
    }

    pub async fn get_credential(
        &self,
        user: &AuthUser,
        id: CredentialId,
    ) -> Result<CredentialDetail, VaultError> {
        let (cred, level, share) = self.load_with_access(user, id, AccessLevel::Read).await?;
        self.detail(cred, level, share).await
    }

    /// Owned credentials together with those shared with the caller, newest first.
    pub async fn list_credentials(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<CredentialSummary>, VaultError> {
        let rows = self.storage.list_visible(user.id).await?;
        Ok(rows
            .into_iter()
            .map(|row| CredentialSummary::from_listing(row, user.id))
            .collect())
    }

    pub async fn list_shared_with_me(
        &self,
        user: &AuthUser,
    ) -> Result<Vec<CredentialSummary>, VaultError> {
        let rows = self.storage.list_shared_with(user.id).await?;
        Ok(rows
            .into_iter()
            .map(|row| CredentialSummary::from_listing(row, user.id))
            .collect())
    }

    pub async fn update_credential(
        &self,
        user: &AuthUser,
        id: CredentialId,
        patch: CredentialPatch,
    ) -> Result<CredentialDetail, VaultError> {
        user.require(abilities::CREDENTIALS_UPDATE)?;
        let (mut cred, level, share) = self.load_with_access(user, id, AccessLevel::Write).await?;

        if let Some(title) = patch.title {
            cred.title = required_text("title", &title, MAX_TEXT_LEN)?;
        }
        if let Some(username) = patch.username {
            cred.username = required_text("username", &username, MAX_TEXT_LEN)?;
        }
        if let Some(description) = patch.description {
            cred.description = optional_text("description", Some(description), MAX_DESCRIPTION_LEN)?;
        }
        if let Some(category_id) = patch.category_id {
            let category = self.category(category_id).await?;
            cred.set_category(Some(&category));
        }
        if let Some(p) = patch.password.as_deref() {
            check_len("password", p, MAX_TEXT_LEN)?;
        }
        cred.set_password(&self.codec, patch.password.as_deref())?;
        cred.updated_at = Utc::now();

        if !self.storage.update_credential(&cred).await? {
            return Err(VaultError::NotFound {
                resource: "credential",
                id,
            });
        }
        info!(user_id = user.id, credential_id = id, "credential updated");
        self.detail(cred, level, share).await
    }

    pub async fn delete_credential(
        &self,
        user: &AuthUser,
        id: CredentialId,
    ) -> Result<(), VaultError> {
        user.require(abilities::CREDENTIALS_DELETE)?;
        let cred = self.load(id).await?;
        if !cred.is_owned_by(user.id) {
            warn!(user_id = user.id, credential_id = id, "delete by non-owner rejected");
            return Err(VaultError::forbidden(format!(
                "only the owner may delete credential {id}"
            )));
        }
        if !self.storage.delete_credential(id).await? {
            return Err(VaultError::NotFound {
                resource: "credential",
                id,
            });
        }
        info!(user_id = user.id, credential_id = id, "credential deleted");
        Ok(())
    }

    // ─── sharing ────────────────────────────────────────────────────────────

    /// Grant or change a user's access to a credential.
    ///
    /// Checks, first failure wins: caller owns the credential, the credential
    /// is shareable, the grantee exists and is not the owner, the permission
    /// is `read` or `write`.
    pub async fn grant_share(
        &self,
        user: &AuthUser,
        id: CredentialId,
        grantee: UserId,
        permission: &str,
    ) -> Result<CredentialShare, VaultError> {
        user.require(abilities::CREDENTIALS_SHARE)?;
        let cred = self.load(id).await?;

        if !cred.is_owned_by(user.id) {
            warn!(user_id = user.id, credential_id = id, "share by non-owner rejected");
            return Err(VaultError::forbidden(format!(
                "only the owner may share credential {id}"
            )));
        }
        if !cred.is_shareable() {
            return Err(VaultError::InvalidOperation(
                "credential not shareable".to_string(),
            ));
        }
        if grantee == user.id {
            return Err(VaultError::validation(
                "shared_with_user_id",
                "cannot share a credential with yourself",
            ));
        }
        if self.storage.get_user(grantee).await?.is_none() {
            return Err(VaultError::validation(
                "shared_with_user_id",
                format!("user {grantee} does not exist"),
            ));
        }
        let permission: Permission = permission.parse()?;

        let share = self
            .storage
            .upsert_share(cred.id, user.id, grantee, permission)
            .await?;
        info!(
            credential_id = id,
            shared_by = user.id,
            shared_with = grantee,
            %permission,
            "credential shared"
        );
        Ok(share)
    }

    /// Who the credential is shared with. Owner only.
    pub async fn list_shares(
        &self,
        user: &AuthUser,
        id: CredentialId,
    ) -> Result<Vec<ShareGrantee>, VaultError> {
        let cred = self.load(id).await?;
        if !cred.is_owned_by(user.id) {
            return Err(VaultError::forbidden(format!(
                "only the owner may list shares of credential {id}"
            )));
        }
        self.storage.list_shares(id).await
    }

    /// Users the caller can share with: everyone but themselves.
    pub async fn list_share_targets(&self, user: &AuthUser) -> Result<Vec<UserView>, VaultError> {
        let users = self.storage.list_users_except(user.id).await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    // ─── categories ─────────────────────────────────────────────────────────

    async fn category(&self, id: i64) -> Result<DbCategory, VaultError> {
        self.storage
            .get_category(id)
            .await?
            .ok_or_else(|| VaultError::validation("category_id", format!("category {id} does not exist")))
    }

    pub async fn list_categories(&self) -> Result<Vec<DbCategory>, VaultError> {
        self.storage.list_categories().await
    }

    pub async fn create_category(
        &self,
        user: &AuthUser,
        input: NewCategory,
    ) -> Result<DbCategory, VaultError> {
        user.require(abilities::CATEGORIES_CREATE)?;
        let name = required_text("name", &input.name, MAX_TEXT_LEN)?;
        let description = optional_text("description", input.description, MAX_DESCRIPTION_LEN)?;
        let category = self
            .storage
            .insert_category(&name, description.as_deref())
            .await?;
        info!(user_id = user.id, category_id = category.id, "category created");
        Ok(category)
    }

    pub async fn delete_category(&self, user: &AuthUser, id: i64) -> Result<(), VaultError> {
        user.require(abilities::CATEGORIES_DELETE)?;
        if !self.storage.delete_category(id).await? {
            return Err(VaultError::NotFound {
                resource: "category",
                id,
            });
        }
        info!(user_id = user.id, category_id = id, "category deleted");
        Ok(())
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), VaultError> {
    if value.chars().count() > max {
        return Err(VaultError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

fn required_text(field: &str, value: &str, max: usize) -> Result<String, VaultError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(VaultError::validation(field, "is required"));
    }
    check_len(field, value, max)?;
    Ok(value.to_string())
}

fn optional_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, VaultError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            check_len(field, v, max)?;
            Ok(Some(v.to_string()))
        }
    }
}
