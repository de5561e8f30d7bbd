pub mod session;

pub use session::{MaybeSession, RequireSession};
