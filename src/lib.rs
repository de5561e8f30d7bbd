pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod google_oauth;
pub mod server;
pub mod service;

mod oauth_utils;
mod utils;

pub use error::CatalogError;
