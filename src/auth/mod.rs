//! Local credentials and login sessions.

pub mod password;
pub mod session;

pub use session::{ProviderLink, SESSION_COOKIE, Session};
