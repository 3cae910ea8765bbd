//! Database layer
//!
//! Storage for the catalogue. Two backends are supported:
//! - SQLite (default, single-file deployment)
//! - MySQL (shared deployments)
//!
//! The driver is selected from configuration. Everything above this layer
//! talks to the `DatabasePool` trait and the repository traits, never to a
//! concrete sqlx pool.
//!
//! # Usage
//!
//! ```ignore
//! use catalogue_api::config::DatabaseConfig;
//! use catalogue_api::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Whether a repository error was caused by a UNIQUE constraint.
///
/// Services check uniqueness before writing, but a concurrent writer can
/// still get in first; the constraint then has the final word.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}
