use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Process-wide configuration, read once by the binary entry point.
pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: failed to load configuration"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    /// Base64 encoded 32-byte key for password encryption. `base64:` prefix is accepted.
    pub encryption_key: String,
    pub seed_categories: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:vaultshare.sqlite".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            encryption_key: String::new(),
            seed_categories: true,
        }
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `VAULT_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("VAULT_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VAULT_DATABASE_URL", "sqlite::memory:");
            jail.set_env("VAULT_SEED_CATEGORIES", "false");

            let cfg = Config::load()?;
            assert_eq!(cfg.database_url, "sqlite::memory:");
            assert!(!cfg.seed_categories);
            assert_eq!(cfg.listen_addr, "0.0.0.0:8000");
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_merged_under_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                loglevel = "debug"
                listen_addr = "127.0.0.1:9000"
                "#,
            )?;
            jail.set_env("VAULT_LISTEN_ADDR", "127.0.0.1:9100");

            let cfg = Config::load()?;
            assert_eq!(cfg.loglevel, "debug");
            assert_eq!(cfg.listen_addr, "127.0.0.1:9100");
            Ok(())
        });
    }
}
