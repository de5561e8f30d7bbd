use crate::db::models::DbUser;
use crate::db::patch::{OauthUserUpsert, UserCreate};
use crate::error::CatalogError;
use chrono::Utc;
use sqlx::SqliteConnection;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";
const MAX_USERNAME_SUFFIX: u32 = 1000;

pub(super) async fn find_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<DbUser>, CatalogError> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(super) async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<DbUser>, CatalogError> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(super) async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<DbUser>, CatalogError> {
    let row = sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn insert(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password_hash: Option<&str>,
) -> Result<DbUser, CatalogError> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (username, email, password_hash, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub(super) async fn create(
    conn: &mut SqliteConnection,
    create: UserCreate,
) -> Result<DbUser, CatalogError> {
    if find_by_username(conn, &create.username).await?.is_some() {
        return Err(CatalogError::Conflict("Current username taken.".to_string()));
    }
    if find_by_email(conn, &create.email).await?.is_some() {
        return Err(CatalogError::Conflict("Current email taken.".to_string()));
    }
    insert(
        conn,
        &create.username,
        &create.email,
        Some(&create.password_hash),
    )
    .await
}

/// Find the account for a provider-verified email, or create one without a local password.
pub(super) async fn upsert_oauth(
    conn: &mut SqliteConnection,
    upsert: OauthUserUpsert,
) -> Result<DbUser, CatalogError> {
    if let Some(existing) = find_by_email(conn, &upsert.email).await? {
        if existing.password_hash.is_some() && !upsert.link_existing_accounts {
            return Err(CatalogError::Conflict(
                "An account with this email already exists; log in with its password.".to_string(),
            ));
        }
        return Ok(existing);
    }

    let base = username_base(upsert.name.as_deref(), &upsert.email);
    let mut candidate = base.clone();
    let mut suffix = 1;
    while find_by_username(conn, &candidate).await?.is_some() {
        suffix += 1;
        if suffix > MAX_USERNAME_SUFFIX {
            return Err(CatalogError::Conflict(
                "Could not derive a free username for this account.".to_string(),
            ));
        }
        candidate = format!("{base}-{suffix}");
    }

    insert(conn, &candidate, &upsert.email, None).await
}

/// Username derived from a display name, falling back to the email local part.
fn username_base(name: Option<&str>, email: &str) -> String {
    let from_name = name.map(str::trim).filter(|n| !n.is_empty());
    let raw = from_name.unwrap_or_else(|| email.split('@').next().unwrap_or(email));
    let base: String = raw.chars().take(24).collect();
    if base.trim().is_empty() {
        "user".to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::username_base;

    #[test]
    fn username_base_prefers_display_name() {
        assert_eq!(username_base(Some("Alice Liddell"), "a@x.com"), "Alice Liddell");
        assert_eq!(username_base(Some("   "), "bob@x.com"), "bob");
        assert_eq!(username_base(None, "carol@x.com"), "carol");
    }

    #[test]
    fn username_base_is_bounded() {
        let long = "x".repeat(100);
        assert_eq!(username_base(Some(&long), "a@x.com").len(), 24);
        assert_eq!(username_base(None, "@x.com"), "user");
    }
}
