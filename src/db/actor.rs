use crate::db::models::{DbCategory, DbItem, DbSession, DbUser};
use crate::db::patch::{
    CategoryCreate, CategoryKey, CategoryPatch, ItemCreate, ItemFilter, ItemKey, ItemPatch,
    OauthUserUpsert, SessionCreate, UserCreate,
};
use crate::db::schema::SQLITE_INIT;
use crate::db::{catalog, sessions, users};
use crate::error::CatalogError;
use catalog_schema::CatalogExport;
use chrono::Duration as IdleTimeout;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

type Reply<T> = RpcReplyPort<Result<T, CatalogError>>;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Register a local account; fails on duplicate username or email.
    CreateUser(UserCreate, Reply<DbUser>),

    FindUserByUsername(String, Reply<Option<DbUser>>),

    GetUser(i64, Reply<Option<DbUser>>),

    /// Find or create the account for a provider-verified email.
    UpsertOauthUser(OauthUserUpsert, Reply<DbUser>),

    CreateSession(SessionCreate, Reply<DbSession>),

    /// Resolve a live session (and its user), refreshing its idle timer.
    TouchSession(String, IdleTimeout, Reply<Option<(DbSession, DbUser)>>),

    DeleteSession(String, Reply<Option<DbSession>>),

    /// Drop every session idle for longer than the timeout; returns the number removed.
    PurgeIdleSessions(IdleTimeout, Reply<u64>),

    /// Create a category owned by the given user id.
    CreateCategory(i64, CategoryCreate, Reply<DbCategory>),

    /// Rename a category; the user id must own it.
    UpdateCategory(i64, CategoryKey, CategoryPatch, Reply<DbCategory>),

    /// Delete an empty category; the user id must own it.
    DeleteCategory(i64, CategoryKey, Reply<DbCategory>),

    GetCategory(CategoryKey, Reply<DbCategory>),

    ListCategories(Reply<Vec<DbCategory>>),

    CreateItem(i64, ItemCreate, Reply<DbItem>),

    UpdateItem(i64, ItemKey, ItemPatch, Reply<DbItem>),

    DeleteItem(i64, ItemKey, Reply<DbItem>),

    GetItem(ItemKey, Reply<(DbCategory, DbItem)>),

    ListItems(ItemFilter, Reply<Vec<DbItem>>),

    /// Snapshot of every category with its nested items.
    ExportCatalog(Reply<CatalogExport>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn create_user(&self, create: UserCreate) -> Result<DbUser, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::CreateUser, create)
            .map_err(|e| CatalogError::RactorError(format!("DbActor CreateUser RPC failed: {e}")))?
    }

    pub async fn find_user_by_username(
        &self,
        username: String,
    ) -> Result<Option<DbUser>, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::FindUserByUsername, username).map_err(|e| {
            CatalogError::RactorError(format!("DbActor FindUserByUsername RPC failed: {e}"))
        })?
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<DbUser>, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::GetUser, id)
            .map_err(|e| CatalogError::RactorError(format!("DbActor GetUser RPC failed: {e}")))?
    }

    pub async fn upsert_oauth_user(
        &self,
        upsert: OauthUserUpsert,
    ) -> Result<DbUser, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::UpsertOauthUser, upsert).map_err(|e| {
            CatalogError::RactorError(format!("DbActor UpsertOauthUser RPC failed: {e}"))
        })?
    }

    pub async fn create_session(&self, create: SessionCreate) -> Result<DbSession, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::CreateSession, create).map_err(|e| {
            CatalogError::RactorError(format!("DbActor CreateSession RPC failed: {e}"))
        })?
    }

    pub async fn touch_session(
        &self,
        id: String,
        idle_timeout: IdleTimeout,
    ) -> Result<Option<(DbSession, DbUser)>, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::TouchSession, id, idle_timeout).map_err(|e| {
            CatalogError::RactorError(format!("DbActor TouchSession RPC failed: {e}"))
        })?
    }

    pub async fn delete_session(&self, id: String) -> Result<Option<DbSession>, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::DeleteSession, id).map_err(|e| {
            CatalogError::RactorError(format!("DbActor DeleteSession RPC failed: {e}"))
        })?
    }

    pub async fn purge_idle_sessions(&self, idle_timeout: IdleTimeout) -> Result<u64, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::PurgeIdleSessions, idle_timeout).map_err(|e| {
            CatalogError::RactorError(format!("DbActor PurgeIdleSessions RPC failed: {e}"))
        })?
    }

    pub async fn create_category(
        &self,
        owner_user_id: i64,
        create: CategoryCreate,
    ) -> Result<DbCategory, CatalogError> {
        ractor::call!(
            self.actor,
            DbActorMessage::CreateCategory,
            owner_user_id,
            create
        )
        .map_err(|e| CatalogError::RactorError(format!("DbActor CreateCategory RPC failed: {e}")))?
    }

    pub async fn update_category(
        &self,
        acting_user_id: i64,
        key: CategoryKey,
        patch: CategoryPatch,
    ) -> Result<DbCategory, CatalogError> {
        ractor::call!(
            self.actor,
            DbActorMessage::UpdateCategory,
            acting_user_id,
            key,
            patch
        )
        .map_err(|e| CatalogError::RactorError(format!("DbActor UpdateCategory RPC failed: {e}")))?
    }

    pub async fn delete_category(
        &self,
        acting_user_id: i64,
        key: CategoryKey,
    ) -> Result<DbCategory, CatalogError> {
        ractor::call!(
            self.actor,
            DbActorMessage::DeleteCategory,
            acting_user_id,
            key
        )
        .map_err(|e| CatalogError::RactorError(format!("DbActor DeleteCategory RPC failed: {e}")))?
    }

    pub async fn get_category(&self, key: CategoryKey) -> Result<DbCategory, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::GetCategory, key).map_err(|e| {
            CatalogError::RactorError(format!("DbActor GetCategory RPC failed: {e}"))
        })?
    }

    pub async fn list_categories(&self) -> Result<Vec<DbCategory>, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::ListCategories).map_err(|e| {
            CatalogError::RactorError(format!("DbActor ListCategories RPC failed: {e}"))
        })?
    }

    pub async fn create_item(
        &self,
        owner_user_id: i64,
        create: ItemCreate,
    ) -> Result<DbItem, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::CreateItem, owner_user_id, create)
            .map_err(|e| CatalogError::RactorError(format!("DbActor CreateItem RPC failed: {e}")))?
    }

    pub async fn update_item(
        &self,
        acting_user_id: i64,
        key: ItemKey,
        patch: ItemPatch,
    ) -> Result<DbItem, CatalogError> {
        ractor::call!(
            self.actor,
            DbActorMessage::UpdateItem,
            acting_user_id,
            key,
            patch
        )
        .map_err(|e| CatalogError::RactorError(format!("DbActor UpdateItem RPC failed: {e}")))?
    }

    pub async fn delete_item(
        &self,
        acting_user_id: i64,
        key: ItemKey,
    ) -> Result<DbItem, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::DeleteItem, acting_user_id, key)
            .map_err(|e| CatalogError::RactorError(format!("DbActor DeleteItem RPC failed: {e}")))?
    }

    pub async fn get_item(&self, key: ItemKey) -> Result<(DbCategory, DbItem), CatalogError> {
        ractor::call!(self.actor, DbActorMessage::GetItem, key)
            .map_err(|e| CatalogError::RactorError(format!("DbActor GetItem RPC failed: {e}")))?
    }

    pub async fn list_items(&self, filter: ItemFilter) -> Result<Vec<DbItem>, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::ListItems, filter)
            .map_err(|e| CatalogError::RactorError(format!("DbActor ListItems RPC failed: {e}")))?
    }

    pub async fn export_catalog(&self) -> Result<CatalogExport, CatalogError> {
        ractor::call!(self.actor, DbActorMessage::ExportCatalog).map_err(|e| {
            CatalogError::RactorError(format!("DbActor ExportCatalog RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

/// Run `$body` (an expression using `$conn: &mut SqliteConnection`) inside one transaction.
///
/// The transaction commits only when the body succeeds; any error rolls it back on drop.
macro_rules! transact {
    ($pool:expr, |$conn:ident| $body:expr) => {
        async {
            let mut tx = $pool.begin().await?;
            let $conn: &mut sqlx::SqliteConnection = &mut tx;
            let out = $body.await?;
            tx.commit().await?;
            Ok::<_, CatalogError>(out)
        }
        .await
    };
}

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::CreateUser(create, reply) => {
                let res = transact!(pool, |conn| users::create(conn, create));
                let _ = reply.send(res);
            }
            DbActorMessage::FindUserByUsername(username, reply) => {
                let res = transact!(pool, |conn| users::find_by_username(conn, &username));
                let _ = reply.send(res);
            }
            DbActorMessage::GetUser(id, reply) => {
                let res = transact!(pool, |conn| users::find_by_id(conn, id));
                let _ = reply.send(res);
            }
            DbActorMessage::UpsertOauthUser(upsert, reply) => {
                let res = transact!(pool, |conn| users::upsert_oauth(conn, upsert));
                let _ = reply.send(res);
            }
            DbActorMessage::CreateSession(create, reply) => {
                let res = transact!(pool, |conn| sessions::create(conn, create));
                let _ = reply.send(res);
            }
            DbActorMessage::TouchSession(id, idle_timeout, reply) => {
                let res = transact!(pool, |conn| touch_session_with_user(
                    conn,
                    &id,
                    idle_timeout
                ));
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteSession(id, reply) => {
                let res = transact!(pool, |conn| sessions::delete(conn, &id));
                let _ = reply.send(res);
            }
            DbActorMessage::PurgeIdleSessions(idle_timeout, reply) => {
                let res = transact!(pool, |conn| sessions::purge_idle(conn, idle_timeout));
                let _ = reply.send(res);
            }
            DbActorMessage::CreateCategory(owner, create, reply) => {
                let res = transact!(pool, |conn| catalog::create_category(conn, owner, create));
                let _ = reply.send(res);
            }
            DbActorMessage::UpdateCategory(acting, key, patch, reply) => {
                let res = transact!(pool, |conn| catalog::update_category(
                    conn, acting, &key, patch
                ));
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteCategory(acting, key, reply) => {
                let res = transact!(pool, |conn| catalog::delete_category(conn, acting, &key));
                let _ = reply.send(res);
            }
            DbActorMessage::GetCategory(key, reply) => {
                let res = transact!(pool, |conn| catalog::get_category(conn, &key));
                let _ = reply.send(res);
            }
            DbActorMessage::ListCategories(reply) => {
                let res = transact!(pool, |conn| catalog::list_categories(conn));
                let _ = reply.send(res);
            }
            DbActorMessage::CreateItem(owner, create, reply) => {
                let res = transact!(pool, |conn| catalog::create_item(conn, owner, create));
                let _ = reply.send(res);
            }
            DbActorMessage::UpdateItem(acting, key, patch, reply) => {
                let res = transact!(pool, |conn| catalog::update_item(conn, acting, &key, patch));
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteItem(acting, key, reply) => {
                let res = transact!(pool, |conn| catalog::delete_item(conn, acting, &key));
                let _ = reply.send(res);
            }
            DbActorMessage::GetItem(key, reply) => {
                let res = transact!(pool, |conn| catalog::get_item(conn, &key));
                let _ = reply.send(res);
            }
            DbActorMessage::ListItems(filter, reply) => {
                let res = transact!(pool, |conn| catalog::list_items(conn, &filter));
                let _ = reply.send(res);
            }
            DbActorMessage::ExportCatalog(reply) => {
                let res = transact!(pool, |conn| catalog::export(conn));
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

async fn touch_session_with_user(
    conn: &mut sqlx::SqliteConnection,
    id: &str,
    idle_timeout: IdleTimeout,
) -> Result<Option<(DbSession, DbUser)>, CatalogError> {
    let Some(session) = sessions::touch(conn, id, idle_timeout).await? else {
        return Ok(None);
    };
    let Some(user) = users::find_by_id(conn, session.user_id).await? else {
        sessions::delete(conn, id).await?;
        return Ok(None);
    };
    Ok(Some((session, user)))
}

/// Spawn the database actor and return a cloneable handle.
///
/// The actor is unnamed, so several independent databases can live in one process.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, CatalogError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| CatalogError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), CatalogError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
