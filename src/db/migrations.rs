//! Database migrations
//!
//! Migrations are embedded as SQL strings so the binary carries its own
//! schema. Each `Migration` holds a unique version, a name, and the statements
//! for both SQLite and MySQL. Applied versions are tracked in `_migrations`.
//!
//! ```ignore
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use std::collections::HashSet;

use super::{require_mysql, require_sqlite, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'member',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'member',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO categories (name) VALUES ('General');
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT IGNORE INTO categories (name) VALUES ('General');
        "#,
    },
    // Comments reference articles without ON DELETE CASCADE: removing an
    // article must delete its comments explicitly in the same transaction.
    Migration {
        version: 4,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                author VARCHAR(255) NOT NULL,
                published_on DATE NOT NULL,
                category_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );
            CREATE INDEX IF NOT EXISTS idx_articles_published_on ON articles(published_on);
            CREATE INDEX IF NOT EXISTS idx_articles_category_id ON articles(category_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                author VARCHAR(255) NOT NULL,
                published_on DATE NOT NULL,
                category_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );
            CREATE INDEX idx_articles_published_on ON articles(published_on);
            CREATE INDEX idx_articles_category_id ON articles(category_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_article_id ON comments(article_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                article_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_comments_article_id ON comments(article_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_flashes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS flashes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id VARCHAR(64) NOT NULL,
                level VARCHAR(20) NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_flashes_session_id ON flashes(session_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS flashes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                session_id VARCHAR(64) NOT NULL,
                level VARCHAR(20) NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_flashes_session_id ON flashes(session_id);
        "#,
    },
];

const RECORD_SQL: &str = "INSERT INTO _migrations (version, name) VALUES (?, ?)";

/// Run all pending migrations, returning how many were applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let pending = pending(pool).await?;

    for migration in &pending {
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");
        apply(pool, migration).await.with_context(|| {
            format!("Migration {} ({}) failed", migration.version, migration.name)
        })?;
    }

    if pending.is_empty() {
        tracing::debug!("Schema is up to date");
    }
    Ok(pending.len())
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    Ok(pending(pool).await?.len())
}

async fn pending(pool: &DynDatabasePool) -> Result<Vec<&'static Migration>> {
    ensure_tracking_table(pool).await?;
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&i64::from(m.version)))
        .collect())
}

async fn ensure_tracking_table(pool: &DynDatabasePool) -> Result<()> {
    let version_type = match pool.driver() {
        DatabaseDriver::Sqlite => "INTEGER",
        DatabaseDriver::Mysql => "INT",
    };
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS _migrations (\
            version {} PRIMARY KEY, \
            name VARCHAR(255) NOT NULL, \
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        version_type
    );
    pool.execute(&sql).await?;
    Ok(())
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<HashSet<i64>> {
    const SQL: &str = "SELECT version FROM _migrations";
    let versions = match pool.driver() {
        DatabaseDriver::Sqlite => {
            sqlx::query_scalar::<_, i64>(SQL)
                .fetch_all(require_sqlite(pool)?)
                .await?
        }
        DatabaseDriver::Mysql => sqlx::query_scalar::<_, i32>(SQL)
            .fetch_all(require_mysql(pool)?)
            .await?
            .into_iter()
            .map(i64::from)
            .collect(),
    };
    Ok(versions.into_iter().collect())
}

async fn apply(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            let mut tx = require_sqlite(pool)?.begin().await?;
            for statement in statements(migration.up_sqlite) {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to execute: {}", preview(statement)))?;
            }
            sqlx::query(RECORD_SQL)
                .bind(migration.version)
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }
        // DDL commits implicitly on MySQL, a transaction would not help
        DatabaseDriver::Mysql => {
            let pool = require_mysql(pool)?;
            for statement in statements(migration.up_mysql) {
                sqlx::query(statement)
                    .execute(pool)
                    .await
                    .with_context(|| format!("Failed to execute: {}", preview(statement)))?;
            }
            sqlx::query(RECORD_SQL)
                .bind(migration.version)
                .bind(migration.name)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}

/// First 100 characters of a statement, for error context
fn preview(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Non-empty statements of a script; chunks holding only `--` comments are dropped
fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|stmt| {
        stmt.lines()
            .any(|line| !line.trim().is_empty() && !line.trim().starts_with("--"))
    })
}
