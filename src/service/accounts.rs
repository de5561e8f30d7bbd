use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::db::{DbActorHandle, DbUser, UserCreate};
use crate::error::CatalogError;
use crate::service::validation;
use catalog_schema::{LoginForm, RegisterForm};
use tracing::{debug, info};

/// Validate a registration form and create the local account.
pub async fn register(db: &DbActorHandle, form: &RegisterForm) -> Result<DbUser, CatalogError> {
    let reg = validation::registration(form)?;
    let password_hash = hash_password_blocking(reg.password).await?;

    let user = db
        .create_user(UserCreate {
            username: reg.username,
            email: reg.email,
            password_hash,
        })
        .await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Check a username/password pair.
///
/// Unknown usernames, provider-only accounts and wrong passwords are indistinguishable to the
/// caller: all of them yield [`CatalogError::InvalidCredentials`].
pub async fn authenticate(db: &DbActorHandle, form: &LoginForm) -> Result<DbUser, CatalogError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(CatalogError::InvalidCredentials);
    }

    let Some(user) = db.find_user_by_username(username.to_string()).await? else {
        debug!("login rejected: unknown username");
        return Err(CatalogError::InvalidCredentials);
    };
    let Some(stored_hash) = user.password_hash.clone() else {
        debug!(user_id = user.id, "login rejected: account has no local password");
        return Err(CatalogError::InvalidCredentials);
    };

    if verify_password_blocking(form.password.clone(), stored_hash).await? {
        Ok(user)
    } else {
        debug!(user_id = user.id, "login rejected: password mismatch");
        Err(CatalogError::InvalidCredentials)
    }
}
