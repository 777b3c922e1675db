use crate::db::models::{
    Credential, CredentialId, CredentialListing, CredentialShare, DbCategory, DbUser, Permission,
    ShareGrantee, TokenOwner, UserId,
};
use crate::db::schema::{DEFAULT_CATEGORIES, SQLITE_INIT};
use crate::error::VaultError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

const CREDENTIAL_COLUMNS: &str = r#"
    c.id, c.user_id, c.category_id, cat.name AS category_name, c.title, c.username,
    c.password, c.description, c.created_at, c.updated_at
"#;

const LISTING_COLUMNS: &str = r#"
    c.id, c.user_id, c.category_id, cat.name AS category_name, c.title, c.username,
    c.description, c.created_at, c.updated_at,
    s.permission AS permission, s.shared_by_user_id AS shared_by_user_id,
    grantor.name AS shared_by_name
"#;

#[derive(Clone)]
pub struct VaultStorage {
    pool: SqlitePool,
}

impl VaultStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool with foreign keys enforced. In-memory databases are pinned to
    /// a single long-lived connection so every query sees the same data.
    pub async fn connect(database_url: &str) -> Result<Self, VaultError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(connect_opts)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(connect_opts).await?
        };
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), VaultError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        debug!("schema initialized");
        Ok(())
    }

    /// Insert the default categories when none exist yet. Returns how many were inserted.
    pub async fn seed_default_categories(&self) -> Result<usize, VaultError> {
        let mut tx = self.pool.begin().await?;
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        for (name, description) in DEFAULT_CATEGORIES {
            sqlx::query(
                "INSERT INTO categories (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(*name)
            .bind(*description)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!(count = DEFAULT_CATEGORIES.len(), "seeded default categories");
        Ok(DEFAULT_CATEGORIES.len())
    }

    // ─── users & tokens ─────────────────────────────────────────────────────

    pub async fn insert_user(&self, name: &str, email: &str) -> Result<DbUser, VaultError> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"INSERT INTO users (name, email, created_at) VALUES (?, ?, ?)
               RETURNING id, name, email, created_at"#,
        )
        .bind(name)
        .bind(email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<DbUser>, VaultError> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_users_except(&self, id: UserId) -> Result<Vec<DbUser>, VaultError> {
        let users = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, created_at FROM users WHERE id != ? ORDER BY name, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Store a token by its digest. The plaintext token never reaches the database.
    pub async fn insert_token(
        &self,
        user_id: UserId,
        name: &str,
        token_hash: &str,
        abilities: &[String],
    ) -> Result<i64, VaultError> {
        let abilities_json =
            serde_json::to_string(abilities).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let rec: (i64,) = sqlx::query_as(
            r#"INSERT INTO api_tokens (user_id, name, token_hash, abilities, created_at)
               VALUES (?, ?, ?, ?, ?) RETURNING id"#,
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .bind(abilities_json)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn find_token_owner(&self, token_hash: &str) -> Result<Option<TokenOwner>, VaultError> {
        let row = sqlx::query(
            r#"SELECT t.id AS token_id, t.abilities, u.id, u.name, u.email, u.created_at
               FROM api_tokens t JOIN users u ON u.id = t.user_id
               WHERE t.token_hash = ?"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_token_owner).transpose()
    }

    pub async fn touch_token(&self, token_id: i64) -> Result<(), VaultError> {
        sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(token_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── categories ─────────────────────────────────────────────────────────

    pub async fn list_categories(&self) -> Result<Vec<DbCategory>, VaultError> {
        let rows = sqlx::query_as::<_, DbCategory>(
            "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<DbCategory>, VaultError> {
        let row = sqlx::query_as::<_, DbCategory>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<DbCategory, VaultError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbCategory>(
            r#"INSERT INTO categories (name, description, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, description, created_at, updated_at"#,
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Returns whether a row was removed. Credentials in it fall back to no category.
    pub async fn delete_category(&self, id: i64) -> Result<bool, VaultError> {
        let res = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // ─── credentials ────────────────────────────────────────────────────────

    /// Insert a new credential and return it as stored.
    pub async fn insert_credential(&self, cred: &Credential) -> Result<Credential, VaultError> {
        let rec: (i64,) = sqlx::query_as(
            r#"INSERT INTO credentials (
                   user_id, category_id, title, username, password, description,
                   created_at, updated_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(cred.user_id)
        .bind(cred.category_id)
        .bind(&cred.title)
        .bind(&cred.username)
        .bind(cred.password_ciphertext())
        .bind(&cred.description)
        .bind(cred.created_at)
        .bind(cred.updated_at)
        .fetch_one(&self.pool)
        .await?;

        self.get_credential(rec.0)
            .await?
            .ok_or(VaultError::NotFound {
                resource: "credential",
                id: rec.0,
            })
    }

    pub async fn get_credential(&self, id: CredentialId) -> Result<Option<Credential>, VaultError> {
        let sql = format!(
            r#"SELECT {CREDENTIAL_COLUMNS}
               FROM credentials c
               LEFT JOIN categories cat ON cat.id = c.category_id
               WHERE c.id = ?"#
        );
        let row = sqlx::query_as::<_, Credential>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Update every mutable field by id. Ownership is never rewritten here.
    pub async fn update_credential(&self, cred: &Credential) -> Result<bool, VaultError> {
        let res = sqlx::query(
            r#"UPDATE credentials SET
                   category_id = ?,
                   title = ?,
                   username = ?,
                   password = ?,
                   description = ?,
                   updated_at = ?
               WHERE id = ?"#,
        )
        .bind(cred.category_id)
        .bind(&cred.title)
        .bind(&cred.username)
        .bind(cred.password_ciphertext())
        .bind(&cred.description)
        .bind(cred.updated_at)
        .bind(cred.id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Delete a credential; its shares go with it through the foreign-key cascade.
    pub async fn delete_credential(&self, id: CredentialId) -> Result<bool, VaultError> {
        let res = sqlx::query("DELETE FROM credentials WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Credentials owned by `user` together with those shared with them.
    pub async fn list_visible(&self, user: UserId) -> Result<Vec<CredentialListing>, VaultError> {
        let sql = format!(
            r#"SELECT {LISTING_COLUMNS}
               FROM credentials c
               LEFT JOIN categories cat ON cat.id = c.category_id
               LEFT JOIN credential_shares s
                   ON s.credential_id = c.id AND s.shared_with_user_id = ?
               LEFT JOIN users grantor ON grantor.id = s.shared_by_user_id
               WHERE c.user_id = ? OR s.id IS NOT NULL
               ORDER BY c.created_at DESC, c.id DESC"#
        );
        let rows = sqlx::query_as::<_, CredentialListing>(&sql)
            .bind(user)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Only the credentials other users shared with `user`.
    pub async fn list_shared_with(
        &self,
        user: UserId,
    ) -> Result<Vec<CredentialListing>, VaultError> {
        let sql = format!(
            r#"SELECT {LISTING_COLUMNS}
               FROM credentials c
               JOIN credential_shares s ON s.credential_id = c.id
               LEFT JOIN categories cat ON cat.id = c.category_id
               LEFT JOIN users grantor ON grantor.id = s.shared_by_user_id
               WHERE s.shared_with_user_id = ?
               ORDER BY c.created_at DESC, c.id DESC"#
        );
        let rows = sqlx::query_as::<_, CredentialListing>(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ─── shares ─────────────────────────────────────────────────────────────

    /// Upsert by unique (credential_id, shared_with_user_id) in one statement.
    /// Re-granting an identical permission leaves the row untouched.
    pub async fn upsert_share(
        &self,
        credential_id: CredentialId,
        shared_by: UserId,
        shared_with: UserId,
        permission: Permission,
    ) -> Result<CredentialShare, VaultError> {
        let now = Utc::now();
        let share = sqlx::query_as::<_, CredentialShare>(
            r#"
            INSERT INTO credential_shares (
                credential_id, shared_by_user_id, shared_with_user_id, permission,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(credential_id, shared_with_user_id) DO UPDATE SET
                shared_by_user_id = excluded.shared_by_user_id,
                permission = excluded.permission,
                updated_at = CASE
                    WHEN credential_shares.permission = excluded.permission
                     AND credential_shares.shared_by_user_id = excluded.shared_by_user_id
                    THEN credential_shares.updated_at
                    ELSE excluded.updated_at
                END
            RETURNING id, credential_id, shared_by_user_id, shared_with_user_id, permission,
                      created_at, updated_at
            "#,
        )
        .bind(credential_id)
        .bind(shared_by)
        .bind(shared_with)
        .bind(permission)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(share)
    }

    pub async fn share_for(
        &self,
        credential_id: CredentialId,
        user: UserId,
    ) -> Result<Option<CredentialShare>, VaultError> {
        let share = sqlx::query_as::<_, CredentialShare>(
            r#"SELECT id, credential_id, shared_by_user_id, shared_with_user_id, permission,
                      created_at, updated_at
               FROM credential_shares
               WHERE credential_id = ? AND shared_with_user_id = ?"#,
        )
        .bind(credential_id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;
        Ok(share)
    }

    pub async fn list_shares(
        &self,
        credential_id: CredentialId,
    ) -> Result<Vec<ShareGrantee>, VaultError> {
        let rows = sqlx::query_as::<_, ShareGrantee>(
            r#"SELECT s.id, s.credential_id, s.shared_with_user_id,
                      u.name AS shared_with_name, u.email AS shared_with_email,
                      s.permission, s.updated_at
               FROM credential_shares s JOIN users u ON u.id = s.shared_with_user_id
               WHERE s.credential_id = ?
               ORDER BY u.name, s.id"#,
        )
        .bind(credential_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    fn row_to_token_owner(row: SqliteRow) -> Result<TokenOwner, VaultError> {
        let token_id: i64 = row.try_get("token_id")?;
        let abilities_json: String = row.try_get("abilities")?;
        let id: UserId = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let email: String = row.try_get("email")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        let abilities: Vec<String> = serde_json::from_str(&abilities_json)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(TokenOwner {
            token_id,
            user: DbUser {
                id,
                name,
                email,
                created_at,
            },
            abilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> VaultStorage {
        let storage = VaultStorage::connect("sqlite::memory:").await.unwrap();
        storage.init_schema().await.unwrap();
        storage.seed_default_categories().await.unwrap();
        storage
    }

    async fn category_named(storage: &VaultStorage, name: &str) -> DbCategory {
        storage
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap()
    }

    async fn credential(storage: &VaultStorage, owner: UserId, category: &str) -> Credential {
        let cat = category_named(storage, category).await;
        let cred = Credential::new(owner, Some(&cat), "mail".into(), "me".into(), None);
        storage.insert_credential(&cred).await.unwrap()
    }

    #[tokio::test]
    async fn schema_init_is_idempotent_and_seeds_once() {
        let storage = storage().await;
        storage.init_schema().await.unwrap();
        assert_eq!(storage.seed_default_categories().await.unwrap(), 0);
        let names: Vec<_> = storage
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            ["Personal", "Social", "Work", "Banking", "Entertainment", "Other"]
        );
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_grantee() {
        let storage = storage().await;
        let owner = storage.insert_user("Owner", "o@local").await.unwrap();
        let grantee = storage.insert_user("Grantee", "g@local").await.unwrap();
        let cred = credential(&storage, owner.id, "Work").await;

        let first = storage
            .upsert_share(cred.id, owner.id, grantee.id, Permission::Read)
            .await
            .unwrap();
        let again = storage
            .upsert_share(cred.id, owner.id, grantee.id, Permission::Read)
            .await
            .unwrap();
        assert_eq!(first, again);

        let upgraded = storage
            .upsert_share(cred.id, owner.id, grantee.id, Permission::Write)
            .await
            .unwrap();
        assert_eq!(upgraded.id, first.id);
        assert_eq!(upgraded.permission, Permission::Write);

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM credential_shares WHERE credential_id = ?")
                .bind(cred.id)
                .fetch_one(storage.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn direct_duplicate_share_insert_is_rejected() {
        let storage = storage().await;
        let owner = storage.insert_user("Owner", "o@local").await.unwrap();
        let grantee = storage.insert_user("Grantee", "g@local").await.unwrap();
        let cred = credential(&storage, owner.id, "Work").await;
        storage
            .upsert_share(cred.id, owner.id, grantee.id, Permission::Read)
            .await
            .unwrap();

        let err = sqlx::query(
            r#"INSERT INTO credential_shares (credential_id, shared_by_user_id,
                   shared_with_user_id, permission, created_at, updated_at)
               VALUES (?, ?, ?, 'write', ?, ?)"#,
        )
        .bind(cred.id)
        .bind(owner.id)
        .bind(grantee.id)
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(storage.pool())
        .await
        .unwrap_err();

        let db_err = err.as_database_error().expect("database error");
        assert!(db_err.is_unique_violation());
    }

    #[tokio::test]
    async fn deleting_credential_cascades_to_shares() {
        let storage = storage().await;
        let owner = storage.insert_user("Owner", "o@local").await.unwrap();
        let grantee = storage.insert_user("Grantee", "g@local").await.unwrap();
        let cred = credential(&storage, owner.id, "Work").await;
        storage
            .upsert_share(cred.id, owner.id, grantee.id, Permission::Write)
            .await
            .unwrap();

        assert!(storage.delete_credential(cred.id).await.unwrap());
        assert_eq!(storage.share_for(cred.id, grantee.id).await.unwrap(), None);
        assert!(storage.get_credential(cred.id).await.unwrap().is_none());
        assert!(!storage.delete_credential(cred.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_category_nulls_credential_category() {
        let storage = storage().await;
        let owner = storage.insert_user("Owner", "o@local").await.unwrap();
        let cat = storage.insert_category("Temp", None).await.unwrap();
        let cred = Credential::new(owner.id, Some(&cat), "t".into(), "u".into(), None);
        let cred = storage.insert_credential(&cred).await.unwrap();
        assert_eq!(cred.category_name.as_deref(), Some("Temp"));

        assert!(storage.delete_category(cat.id).await.unwrap());
        let cred = storage.get_credential(cred.id).await.unwrap().unwrap();
        assert_eq!(cred.category_id, None);
        assert_eq!(cred.category_name, None);
    }

    #[tokio::test]
    async fn visible_listing_is_owned_union_shared_without_duplicates() {
        let storage = storage().await;
        let alice = storage.insert_user("Alice", "a@local").await.unwrap();
        let bob = storage.insert_user("Bob", "b@local").await.unwrap();
        let carol = storage.insert_user("Carol", "c@local").await.unwrap();

        let own = credential(&storage, alice.id, "Work").await;
        let from_bob = credential(&storage, bob.id, "Work").await;
        let _bob_private = credential(&storage, bob.id, "Work").await;
        storage
            .upsert_share(from_bob.id, bob.id, alice.id, Permission::Read)
            .await
            .unwrap();
        // a share to someone else must not add rows to Alice's listing
        storage
            .upsert_share(own.id, alice.id, carol.id, Permission::Write)
            .await
            .unwrap();

        let visible = storage.list_visible(alice.id).await.unwrap();
        let mut ids: Vec<_> = visible.iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, vec![own.id, from_bob.id]);

        let shared_row = visible.iter().find(|r| r.id == from_bob.id).unwrap();
        assert_eq!(shared_row.permission, Some(Permission::Read));
        assert_eq!(shared_row.shared_by_name.as_deref(), Some("Bob"));
        let own_row = visible.iter().find(|r| r.id == own.id).unwrap();
        assert_eq!(own_row.permission, None);

        let shared = storage.list_shared_with(alice.id).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, from_bob.id);
    }

    #[tokio::test]
    async fn token_lookup_returns_owner_and_abilities() {
        let storage = storage().await;
        let user = storage.insert_user("Alice", "a@local").await.unwrap();
        let abilities = vec!["credentials:create".to_string()];
        let token_id = storage
            .insert_token(user.id, "cli", "deadbeef", &abilities)
            .await
            .unwrap();

        let owner = storage.find_token_owner("deadbeef").await.unwrap().unwrap();
        assert_eq!(owner.token_id, token_id);
        assert_eq!(owner.user, user);
        assert_eq!(owner.abilities, abilities);
        assert!(storage.find_token_owner("other").await.unwrap().is_none());
    }
}
