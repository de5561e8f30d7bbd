mod basic;
mod oauth;

pub use basic::BasicConfig;
pub use oauth::{ClientSecrets, GoogleOauthResolvedConfig, OauthConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Third-party sign-in settings (see `oauth` table in config.toml).
    #[serde(default)]
    pub oauth: OauthConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Minimum length of `basic.session_secret`; the private-cookie key needs 64 bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

/// Upper bound for `basic.session_idle_timeout_secs` (ten years).
pub const MAX_SESSION_IDLE_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration from the TOML file (with defaults) and validates required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {}", DEFAULT_CONFIG_FILE);
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if let Err(reason) = cfg.validate() {
            panic!("{reason}");
        }
        cfg
    }

    /// Checks fields that have no safe default.
    pub fn validate(&self) -> Result<(), String> {
        if self.basic.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(format!(
                "basic.session_secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            ));
        }
        if self.basic.session_idle_timeout_secs == 0 {
            return Err("basic.session_idle_timeout_secs must be greater than zero".to_string());
        }
        if self.basic.session_idle_timeout_secs > MAX_SESSION_IDLE_TIMEOUT_SECS {
            return Err(format!(
                "basic.session_idle_timeout_secs must be at most {MAX_SESSION_IDLE_TIMEOUT_SECS}"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .extract()
            .expect("defaults extract");

        assert_eq!(cfg.basic.listen_port, 8000);
        assert_eq!(cfg.basic.database_url, "sqlite://catalog.db");
        assert_eq!(cfg.basic.session_idle_timeout_secs, 7 * 24 * 60 * 60);
        assert!(!cfg.basic.insecure_cookie);
        assert!(cfg.oauth.link_existing_accounts);
        assert_eq!(cfg.oauth.request_timeout_secs, 10);
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                listen_port = 9000
                session_secret = 12345

                [oauth]
                link_existing_accounts = false
                "#,
            ))
            .extract()
            .expect("toml extracts");

        assert_eq!(cfg.basic.listen_port, 9000);
        assert_eq!(cfg.basic.session_secret, "12345");
        assert!(!cfg.oauth.link_existing_accounts);
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_err());

        cfg.basic.session_secret = "s".repeat(MIN_SESSION_SECRET_LEN);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_bounds_idle_timeout() {
        let mut cfg = Config::default();
        cfg.basic.session_secret = "s".repeat(MIN_SESSION_SECRET_LEN);

        cfg.basic.session_idle_timeout_secs = MAX_SESSION_IDLE_TIMEOUT_SECS;
        assert!(cfg.validate().is_ok());

        for secs in [0, MAX_SESSION_IDLE_TIMEOUT_SECS + 1, 10_000_000_000_000, u64::MAX] {
            cfg.basic.session_idle_timeout_secs = secs;
            assert!(cfg.validate().is_err(), "{secs} accepted");
        }
    }
}
