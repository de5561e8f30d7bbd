//! Google sign-in through the one-time authorization code flow.
//!
//! The browser obtains a code from Google and posts it to `/gconnect`; the server exchanges it,
//! validates the resulting token, and maps the verified email onto a local account.

pub mod endpoints;
pub mod service;

pub use service::{ConnectOutcome, GoogleConnect};

/// Provider name stored on sessions created through this module.
pub const PROVIDER_GOOGLE: &str = "google";
