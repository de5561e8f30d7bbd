use super::PROVIDER_GOOGLE;
use super::endpoints::GoogleOauthEndpoints;
use crate::auth::{ProviderLink, Session, session::start_session};
use crate::config::GoogleOauthResolvedConfig;
use crate::db::{DbActorHandle, DbUser, OauthUserUpsert};
use crate::error::{CatalogError, OauthError};
use crate::utils::jwt::subject_from_id_token;
use oauth2::{AuthorizationCode, TokenResponse};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

/// Result of a successful `/gconnect`.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// The caller's session already belongs to this provider subject.
    AlreadyConnected(DbUser),
    /// A new session was started; the id goes into the session cookie.
    Connected { user: DbUser, session_id: String },
}

/// One `/gconnect` request: the code posted by the browser plus the state pair to compare.
pub struct GoogleConnect<'a> {
    pub google: Option<&'a GoogleOauthResolvedConfig>,
    pub http: &'a reqwest::Client,
    pub db: &'a DbActorHandle,
    /// State issued with the login view, read back from the private cookie.
    pub expected_state: Option<&'a str>,
    /// State echoed in the query string.
    pub received_state: Option<&'a str>,
    /// Session presented with the request; replaced when a new one is started.
    pub current: Option<&'a Session>,
}

impl GoogleConnect<'_> {
    pub async fn connect(self, code: String) -> Result<ConnectOutcome, CatalogError> {
        if !states_match(self.expected_state, self.received_state) {
            warn!("gconnect rejected: state mismatch");
            return Err(OauthError::StateMismatch.into());
        }
        let cfg = self.google.ok_or(OauthError::Disabled)?;

        let code = code.trim();
        if code.is_empty() {
            return Err(OauthError::Exchange {
                message: "empty authorization code".to_string(),
            }
            .into());
        }

        let code = AuthorizationCode::new(code.to_string());
        let token = GoogleOauthEndpoints::exchange_authorization_code(cfg, code, self.http)
            .await
            .map_err(exchange_failure)?;
        let access_token = token.access_token().secret().to_string();

        let id_token = token
            .extra_fields()
            .id_token
            .as_deref()
            .ok_or_else(|| token_mismatch("Token response carries no id_token."))?;
        let subject = subject_from_id_token(id_token)
            .ok_or_else(|| token_mismatch("id_token carries no subject."))?;

        let info = GoogleOauthEndpoints::fetch_tokeninfo(cfg, &access_token, self.http).await?;
        if let Some(error) = info.error {
            debug!(%error, description = ?info.error_description, "tokeninfo rejected token");
            return Err(token_mismatch("Access token is not valid."));
        }
        if info.user_id.as_deref() != Some(subject.as_str()) {
            return Err(token_mismatch("Token's user ID doesn't match given user ID."));
        }
        if info.issued_to.as_deref() != Some(cfg.client_id.as_str()) {
            return Err(token_mismatch("Token's client ID does not match app's."));
        }

        if let Some(session) = self.current {
            let same_subject = session
                .provider
                .as_ref()
                .is_some_and(|link| link.provider == PROVIDER_GOOGLE && link.subject == subject);
            if same_subject {
                info!(user_id = session.user_id(), "gconnect: current user is already connected");
                return Ok(ConnectOutcome::AlreadyConnected(session.user.clone()));
            }
        }

        let profile = GoogleOauthEndpoints::fetch_userinfo(cfg, &access_token, self.http).await?;
        let email = profile
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| token_mismatch("Provider did not return an email address."))?;
        if profile.verified_email == Some(false) {
            return Err(token_mismatch("Provider email address is not verified."));
        }

        let user = self
            .db
            .upsert_oauth_user(OauthUserUpsert {
                email,
                name: profile.name,
                link_existing_accounts: cfg.link_existing_accounts,
            })
            .await?;

        // The caller's previous session goes before the new one exists.
        if let Some(previous) = self.current {
            self.db.delete_session(previous.id.clone()).await?;
        }
        let session_id = start_session(
            self.db,
            user.id,
            Some(ProviderLink {
                provider: PROVIDER_GOOGLE.to_string(),
                subject,
                access_token,
            }),
        )
        .await?;
        info!(user_id = user.id, "gconnect: session started");

        Ok(ConnectOutcome::Connected { user, session_id })
    }
}

/// Constant-time comparison; a missing side never matches.
fn states_match(expected: Option<&str>, received: Option<&str>) -> bool {
    match (expected, received) {
        (Some(expected), Some(received)) if !expected.is_empty() => {
            bool::from(expected.as_bytes().ct_eq(received.as_bytes()))
        }
        _ => false,
    }
}

fn token_mismatch(message: &str) -> CatalogError {
    OauthError::TokenMismatch {
        message: message.to_string(),
    }
    .into()
}

/// Any failure of the token endpoint itself is reported as a rejected exchange.
fn exchange_failure(e: OauthError) -> CatalogError {
    match e {
        OauthError::ServerResponse { error } => OauthError::Exchange { message: error },
        OauthError::Parse { message, .. } => OauthError::Exchange { message },
        OauthError::Request(err) => OauthError::Exchange {
            message: err.to_string(),
        },
        OauthError::Other { message } => OauthError::Exchange { message },
        other => other,
    }
    .into()
}
