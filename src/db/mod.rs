//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and the credential entity
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: queries, including the share upsert and visibility listings

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{
    Credential, CredentialId, CredentialListing, CredentialShare, DbCategory, DbUser,
    NON_SHAREABLE_CATEGORY, Permission, ShareGrantee, TokenOwner, UserId,
};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, VaultStorage};
