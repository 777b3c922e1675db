pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use crypto::PasswordCodec;
pub use error::VaultError;
pub use service::{AccessLevel, VaultService};
