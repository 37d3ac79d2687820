//! Database connection and schema

pub mod init;
pub mod migrations;

pub use init::{connect, init_database};
pub use migrations::{current_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
