use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Google sign-in configuration managed by Figment.
///
/// Client id/secret are not part of `config.toml`; they are read from the client secrets JSON
/// file downloaded from the provider console (see [`ClientSecrets`]).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OauthConfig {
    /// Path of the provider's client secrets JSON.
    /// TOML: `oauth.client_secrets_file`. Default: `client_secrets.json`.
    #[serde(default = "default_client_secrets_file")]
    pub client_secrets_file: PathBuf,

    /// `redirect_uri` sent with the code exchange. The one-time-code flow uses `postmessage`.
    /// TOML: `oauth.redirect_uri`. Default: `postmessage`.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Token introspection endpoint.
    /// TOML: `oauth.tokeninfo_url`. Default: `https://www.googleapis.com/oauth2/v1/tokeninfo`.
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: Url,

    /// Userinfo endpoint (email + display name).
    /// TOML: `oauth.userinfo_url`. Default: `https://www.googleapis.com/oauth2/v1/userinfo`.
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: Url,

    /// Token revocation endpoint, called on logout.
    /// TOML: `oauth.revoke_url`. Default: `https://oauth2.googleapis.com/revoke`.
    #[serde(default = "default_revoke_url")]
    pub revoke_url: Url,

    /// TOML: `oauth.connect_timeout_secs`. Default: `5`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout for every provider call.
    /// TOML: `oauth.request_timeout_secs`. Default: `10`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional outbound HTTP proxy. Example: `http://127.0.0.1:1080`.
    /// TOML: `oauth.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Sign a provider identity into an existing local account with the same email.
    ///
    /// When `false`, a provider email that matches an account holding a local password is
    /// rejected with a conflict instead of being linked.
    /// TOML: `oauth.link_existing_accounts`. Default: `true`.
    #[serde(default = "default_link_existing_accounts")]
    pub link_existing_accounts: bool,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            client_secrets_file: default_client_secrets_file(),
            redirect_uri: default_redirect_uri(),
            tokeninfo_url: default_tokeninfo_url(),
            userinfo_url: default_userinfo_url(),
            revoke_url: default_revoke_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            proxy: None,
            link_existing_accounts: default_link_existing_accounts(),
        }
    }
}

impl OauthConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Client secrets merged with endpoint settings. `None` disables third-party sign-in.
    pub fn resolve(&self) -> Option<GoogleOauthResolvedConfig> {
        let secrets = self.load_client_secrets()?;
        Some(GoogleOauthResolvedConfig {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            auth_url: secrets.auth_url,
            token_url: secrets.token_url,
            redirect_uri: self.redirect_uri.clone(),
            tokeninfo_url: self.tokeninfo_url.clone(),
            userinfo_url: self.userinfo_url.clone(),
            revoke_url: self.revoke_url.clone(),
            link_existing_accounts: self.link_existing_accounts,
        })
    }

    /// Reads the client secrets file. `None` disables third-party sign-in.
    pub fn load_client_secrets(&self) -> Option<ClientSecrets> {
        match ClientSecrets::from_file(&self.client_secrets_file) {
            Ok(secrets) => {
                info!(
                    path = %self.client_secrets_file.display(),
                    client_id = %secrets.client_id,
                    "OAuth client secrets loaded"
                );
                Some(secrets)
            }
            Err(e) => {
                warn!(
                    path = %self.client_secrets_file.display(),
                    error = %e,
                    "OAuth client secrets unavailable; Google sign-in disabled"
                );
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct GoogleOauthResolvedConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: Url,
    pub token_url: Url,
    pub redirect_uri: String,
    pub tokeninfo_url: Url,
    pub userinfo_url: Url,
    pub revoke_url: Url,
    pub link_existing_accounts: bool,
}

impl std::fmt::Debug for GoogleOauthResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOauthResolvedConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("tokeninfo_url", &self.tokeninfo_url.as_str())
            .field("link_existing_accounts", &self.link_existing_accounts)
            .finish_non_exhaustive()
    }
}

/// OAuth client identity from the provider's client secrets JSON.
///
/// Accepts both the `web` and the `installed` application layouts.
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(rename = "auth_uri")]
    pub auth_url: Url,
    #[serde(rename = "token_uri")]
    pub token_url: Url,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .finish()
    }
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    web: Option<ClientSecrets>,
    installed: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: ClientSecretsFile = serde_json::from_str(raw)?;
        file.web.or(file.installed).ok_or_else(|| {
            CatalogError::UnexpectedError(
                "client secrets JSON has neither a `web` nor an `installed` section".to_string(),
            )
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

fn default_client_secrets_file() -> PathBuf {
    PathBuf::from("client_secrets.json")
}

fn default_redirect_uri() -> String {
    "postmessage".to_string()
}

fn default_tokeninfo_url() -> Url {
    Url::parse("https://www.googleapis.com/oauth2/v1/tokeninfo").expect("valid default tokeninfo url")
}

fn default_userinfo_url() -> Url {
    Url::parse("https://www.googleapis.com/oauth2/v1/userinfo").expect("valid default userinfo url")
}

fn default_revoke_url() -> Url {
    Url::parse("https://oauth2.googleapis.com/revoke").expect("valid default revoke url")
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_link_existing_accounts() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB_SECRETS: &str = r#"{
        "web": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "catalog",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost:8000/oauth2callback"],
            "javascript_origins": ["http://localhost:8000"]
        }
    }"#;

    #[test]
    fn parses_web_client_secrets() {
        let secrets = ClientSecrets::from_json(WEB_SECRETS).expect("secrets parse");
        assert_eq!(secrets.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "shh");
        assert_eq!(secrets.token_url.as_str(), "https://oauth2.googleapis.com/token");
        assert_eq!(secrets.redirect_uris.len(), 1);
    }

    #[test]
    fn parses_installed_client_secrets() {
        let raw = WEB_SECRETS.replace("\"web\"", "\"installed\"");
        let secrets = ClientSecrets::from_json(&raw).expect("secrets parse");
        assert_eq!(secrets.client_secret, "shh");
    }

    #[test]
    fn rejects_secrets_without_known_section() {
        let err = ClientSecrets::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::UnexpectedError(_)));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let secrets = ClientSecrets::from_json(WEB_SECRETS).expect("secrets parse");
        let debug = format!("{secrets:?}");
        assert!(!debug.contains("shh"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn missing_file_disables_oauth() {
        let cfg = OauthConfig {
            client_secrets_file: PathBuf::from("/nonexistent/client_secrets.json"),
            ..Default::default()
        };
        assert!(cfg.load_client_secrets().is_none());
    }
}
