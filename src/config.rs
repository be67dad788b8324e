use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

/// Process configuration, layered as defaults then `WAVEPIPE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Backend DSN: a `sqlite:` URL or a path to the database file.
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub bcrypt_cost: u32,
    /// Account created at startup if the username does not exist yet.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:wavepipe.db".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            loglevel: "info".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("WAVEPIPE_"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Admin bootstrap credentials, only when both halves are present and non-empty.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (self.admin_username.as_deref(), self.admin_password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_env() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load()?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.bcrypt_cost, bcrypt::DEFAULT_COST);
            assert!(cfg.admin_credentials().is_none());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("WAVEPIPE_DATABASE_URL", "/var/lib/wavepipe/wavepipe.db");
            jail.set_env("WAVEPIPE_BCRYPT_COST", "10");
            jail.set_env("WAVEPIPE_ADMIN_USERNAME", "admin");
            jail.set_env("WAVEPIPE_ADMIN_PASSWORD", "hunter2");

            let cfg = Config::load()?;
            assert_eq!(cfg.database_url, "/var/lib/wavepipe/wavepipe.db");
            assert_eq!(cfg.bcrypt_cost, 10);
            assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
            assert_eq!(cfg.admin_credentials(), Some(("admin", "hunter2")));
            Ok(())
        });
    }

    #[test]
    fn half_configured_admin_is_ignored() {
        let cfg = Config {
            admin_username: Some("admin".to_string()),
            admin_password: Some(String::new()),
            ..Config::default()
        };
        assert!(cfg.admin_credentials().is_none());
    }
}
