pub mod access;
pub mod vault;

pub use access::{AccessLevel, resolve};
pub use vault::{VaultService, hash_token};
