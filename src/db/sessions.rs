use crate::db::models::DbSession;
use crate::db::patch::SessionCreate;
use crate::error::CatalogError;
use chrono::{Duration, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

const SESSION_COLUMNS: &str =
    "id, user_id, provider, provider_subject, provider_access_token, created_at, last_seen_at";

pub(super) async fn create(
    conn: &mut SqliteConnection,
    create: SessionCreate,
) -> Result<DbSession, CatalogError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, DbSession>(&format!(
        r#"
        INSERT INTO sessions (
            id, user_id, provider, provider_subject, provider_access_token, created_at, last_seen_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {SESSION_COLUMNS}
        "#
    ))
    .bind(create.id)
    .bind(create.user_id)
    .bind(create.provider)
    .bind(create.provider_subject)
    .bind(create.provider_access_token)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Resolve a live session and refresh its `last_seen_at`.
///
/// A session idle for longer than `idle_timeout` is deleted and reported as absent.
pub(super) async fn touch(
    conn: &mut SqliteConnection,
    id: &str,
    idle_timeout: Duration,
) -> Result<Option<DbSession>, CatalogError> {
    let Some(mut session) = sqlx::query_as::<_, DbSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let now = Utc::now();
    if now - session.last_seen_at > idle_timeout {
        debug!(user_id = session.user_id, "session expired after idle timeout");
        delete(conn, id).await?;
        return Ok(None);
    }

    sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    session.last_seen_at = now;
    Ok(Some(session))
}

pub(super) async fn delete(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<DbSession>, CatalogError> {
    let row = sqlx::query_as::<_, DbSession>(&format!(
        "DELETE FROM sessions WHERE id = ? RETURNING {SESSION_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(super) async fn purge_idle(
    conn: &mut SqliteConnection,
    idle_timeout: Duration,
) -> Result<u64, CatalogError> {
    // A timeout reaching past the earliest representable instant leaves nothing idle.
    let Some(cutoff) = Utc::now().checked_sub_signed(idle_timeout) else {
        return Ok(0);
    };
    let res = sqlx::query("DELETE FROM sessions WHERE last_seen_at < ?")
        .bind(cutoff)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected())
}
