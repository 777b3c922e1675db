//! SQL DDL for initializing the vault storage.
//! SQLite-first design; foreign keys must be enabled on the connection for the
//! cascades below to fire.

/// SQLite schema with:
/// - `credentials.user_id` cascading from `users`, `category_id` nulled on category delete
/// - `credential_shares` cascading from its credential and both users
/// - UNIQUE `(credential_id, shared_with_user_id)` backing the share upsert
/// - `permission` restricted to `read` / `write`, grantor and grantee distinct
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS api_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    token_hash TEXT NOT NULL UNIQUE, -- sha256 hex
    abilities TEXT NOT NULL DEFAULT '["*"]', -- JSON array, serialized as text
    created_at TEXT NOT NULL,
    last_used_at TEXT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    category_id INTEGER NULL REFERENCES categories(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    username TEXT NOT NULL,
    password TEXT NULL, -- AES-256-GCM, base64(nonce || ciphertext)
    description TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_credentials_user_id ON credentials(user_id);

CREATE TABLE IF NOT EXISTS credential_shares (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    credential_id INTEGER NOT NULL REFERENCES credentials(id) ON DELETE CASCADE,
    shared_by_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    shared_with_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission TEXT NOT NULL DEFAULT 'read' CHECK (permission IN ('read', 'write')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (credential_id, shared_with_user_id),
    CHECK (shared_by_user_id <> shared_with_user_id)
);

CREATE INDEX IF NOT EXISTS idx_credential_shares_grantee
    ON credential_shares(shared_with_user_id, credential_id);
"#;

/// Categories inserted into an empty database.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Personal", "Personal Info"),
    ("Social", "Social Info"),
    ("Work", "Work Info"),
    ("Banking", "Banking Info"),
    ("Entertainment", "Entertainment Info"),
    ("Other", "Other Info"),
];
