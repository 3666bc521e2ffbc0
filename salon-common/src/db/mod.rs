//! Database models and schema management

#[cfg(feature = "sqlx")]
pub mod init;
#[cfg(feature = "sqlx")]
pub mod migrations;
pub mod models;

#[cfg(feature = "sqlx")]
pub use init::*;
#[cfg(feature = "sqlx")]
pub use migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
pub use models::*;
