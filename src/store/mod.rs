//! libSQL-backed storage for onboarding sessions and
//! patient profiles.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ProfileStore, SessionStore};
