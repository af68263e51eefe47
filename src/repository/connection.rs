use crate::repository::DbPool;
use anyhow::Result;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub async fn establish_connection(database_url: &str) -> Result<DbPool> {
    let db_url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{}", database_url)
    };

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every pooled connection to :memory: would open its own empty database.
    let mut pool_options = SqlitePoolOptions::new();
    if db_url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS packages (
            id TEXT PRIMARY KEY,
            folder_name TEXT NOT NULL,
            project_name TEXT NOT NULL,
            package_name TEXT NOT NULL,
            description TEXT,
            server_address TEXT NOT NULL,
            use_windows_auth BOOLEAN NOT NULL DEFAULT 0,
            username TEXT,
            password TEXT,
            timeout_minutes INTEGER NOT NULL DEFAULT 60,
            package_parameters TEXT,
            last_execution_date TEXT,
            last_execution_status INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (folder_name, project_name, package_name)
        );

        CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            package_id TEXT NOT NULL,
            catalog_execution_id INTEGER,
            status INTEGER NOT NULL,
            start_time TEXT,
            end_time TEXT,
            duration_seconds INTEGER,
            executed_by TEXT,
            execution_parameters TEXT,
            execution_logs TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_executions_package_id ON executions(package_id);
        CREATE INDEX IF NOT EXISTS idx_executions_catalog_execution_id ON executions(catalog_execution_id);
        CREATE INDEX IF NOT EXISTS idx_executions_status_created_at ON executions(status, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_executions_executed_by ON executions(executed_by);
        "#,
    )
    .execute(&pool)
    .await?;

    ensure_catalog_name_column(&pool).await?;

    Ok(pool)
}

/// Databases created before packages carried their own catalog name.
async fn ensure_catalog_name_column(pool: &DbPool) -> Result<()> {
    let columns = sqlx::query("PRAGMA table_info(packages)")
        .fetch_all(pool)
        .await?;
    let has_column = columns
        .iter()
        .any(|row| row.get::<String, _>("name") == "catalog_name");
    if !has_column {
        sqlx::query("ALTER TABLE packages ADD COLUMN catalog_name TEXT NOT NULL DEFAULT 'SSISDB'")
            .execute(pool)
            .await?;
    }
    Ok(())
}
