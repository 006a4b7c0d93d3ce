//! Database layer
//!
//! Database abstraction for Gazette. Supports SQLite (default, single-file
//! deployment) and MySQL, selected from configuration.
//!
//! # Usage
//!
//! ```ignore
//! use gazette::config::DatabaseConfig;
//! use gazette::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, require_mysql, require_sqlite, DatabasePool,
    DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
