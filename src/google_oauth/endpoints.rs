use crate::config::GoogleOauthResolvedConfig;
use crate::error::{CatalogError, OauthError};
use crate::oauth_utils::{OauthTokenResponse, StandardOauth2Client, build_oauth2_client};
use oauth2::{AuthorizationCode, RedirectUrl};
use serde::Deserialize;
use tracing::{info, warn};

/// Stateless Google OAuth endpoints built from resolved config.
///
/// Endpoint URLs come from [`GoogleOauthResolvedConfig`] (and may be pointed at a local server in
/// tests), so a fresh oauth2 client is built per request.
pub struct GoogleOauthEndpoints;

/// Response of the v1 `tokeninfo` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    /// Client id the token was issued to.
    pub issued_to: Option<String>,
    /// Provider subject id of the token's user.
    pub user_id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Response of the v1 `userinfo` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: Option<String>,
    pub verified_email: Option<bool>,
    pub name: Option<String>,
}

impl GoogleOauthEndpoints {
    fn build_client(cfg: &GoogleOauthResolvedConfig) -> Result<StandardOauth2Client, CatalogError> {
        let redirect = RedirectUrl::new(cfg.redirect_uri.clone()).ok();
        build_oauth2_client(
            &cfg.client_id,
            Some(&cfg.client_secret),
            cfg.auth_url.as_str(),
            cfg.token_url.as_str(),
            redirect,
        )
    }

    /// Exchange a one-time authorization code for tokens.
    pub(crate) async fn exchange_authorization_code(
        cfg: &GoogleOauthResolvedConfig,
        code: AuthorizationCode,
        http_client: &reqwest::Client,
    ) -> Result<OauthTokenResponse, OauthError> {
        let client = Self::build_client(cfg).map_err(|e| OauthError::Other {
            message: format!("failed to build oauth2 client: {e}"),
        })?;

        let mut request = client.exchange_code(code);
        if RedirectUrl::new(cfg.redirect_uri.clone()).is_err() {
            // `postmessage` is not a URL, so it cannot live on the client.
            request = request.add_extra_param("redirect_uri", cfg.redirect_uri.clone());
        }

        let token_result: OauthTokenResponse = request.request_async(http_client).await?;
        info!("Google OAuth2 code exchange completed successfully");
        Ok(token_result)
    }

    /// Introspect an access token.
    ///
    /// The endpoint answers 400 with an `error` body for invalid tokens; that body is returned as
    /// data so the caller can report it as a token mismatch.
    pub(crate) async fn fetch_tokeninfo(
        cfg: &GoogleOauthResolvedConfig,
        access_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<TokenInfo, OauthError> {
        let resp = http_client
            .get(cfg.tokeninfo_url.clone())
            .query(&[("access_token", access_token)])
            .send()
            .await?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(OauthError::UpstreamStatus(status));
        }
        let info: TokenInfo = resp.json().await?;
        Ok(info)
    }

    pub(crate) async fn fetch_userinfo(
        cfg: &GoogleOauthResolvedConfig,
        access_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<UserInfo, OauthError> {
        let resp = http_client
            .get(cfg.userinfo_url.clone())
            .query(&[("alt", "json")])
            .bearer_auth(access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OauthError::UpstreamStatus(resp.status()));
        }
        let info: UserInfo = resp.json().await?;
        Ok(info)
    }

    /// Revoke an access token. Failures are logged and otherwise ignored.
    pub(crate) async fn revoke_token(
        cfg: &GoogleOauthResolvedConfig,
        access_token: &str,
        http_client: &reqwest::Client,
    ) {
        let result = http_client
            .post(cfg.revoke_url.clone())
            .form(&[("token", access_token)])
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => info!("Google access token revoked"),
            Ok(resp) => warn!(status = %resp.status(), "Google token revocation rejected"),
            Err(e) => warn!(error = %e, "Google token revocation failed"),
        }
    }
}
