//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `patch.rs`: write payloads and lookup keys
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `actor.rs`: the single actor that owns the pool; every message runs in one transaction

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

mod catalog;
mod sessions;
mod users;

pub use models::{DbCategory, DbItem, DbSession, DbUser};
pub use patch::{
    CategoryCreate, CategoryKey, CategoryPatch, ItemCreate, ItemFilter, ItemKey, ItemPatch,
    OauthUserUpsert, SessionCreate, UserCreate,
};
pub use schema::SQLITE_INIT;

pub use actor::{DbActorHandle, spawn};
