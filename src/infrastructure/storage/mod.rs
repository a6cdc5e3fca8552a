//! Storage infrastructure - SQLite pool and schema migrations

pub mod migrations;
mod sqlite;

pub use migrations::{run_storage_migrations, Migration, Migrator, SqliteMigrator};
pub use sqlite::{connect, health_check, SqliteConfig};
