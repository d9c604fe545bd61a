// src/db.rs - Database setup and schema migrations for the SQLite store

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};

use crate::config::StorageConfig;

pub async fn setup_database(database_url: &str) -> Result<()> {
    if database_url.contains(":memory:") {
        return Ok(());
    }
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database: {}", database_url);
        Sqlite::create_database(database_url).await?;
    }
    Ok(())
}

pub async fn create_database_pool(storage: &StorageConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&storage.database_url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", storage.database_url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(storage.max_connections)
        .connect_with(options)
        .await
        .context("Failed to open SQLite pool")?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Warehouses are scoped per owner namespace; rowid keeps creation order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS warehouses (
            id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 100),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            PRIMARY KEY (owner_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS racks (
            id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            warehouse_id TEXT NOT NULL,
            name TEXT NOT NULL,
            pos_x REAL NOT NULL,
            pos_y REAL NOT NULL DEFAULT 1.0,
            pos_z REAL NOT NULL,
            stock INTEGER NOT NULL DEFAULT 0 CHECK(stock >= 0),
            bags_per_level INTEGER NOT NULL DEFAULT 5 CHECK(bags_per_level >= 1),
            width REAL NOT NULL DEFAULT 1.5 CHECK(width >= 1),
            depth REAL NOT NULL DEFAULT 1.0 CHECK(depth >= 1),
            entry_date TEXT,
            expiry_date TEXT,
            rate REAL NOT NULL DEFAULT 0 CHECK(rate >= 0),
            PRIMARY KEY (owner_id, warehouse_id, id),
            FOREIGN KEY (owner_id, warehouse_id)
                REFERENCES warehouses (owner_id, id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_racks_warehouse ON racks(owner_id, warehouse_id)")
        .execute(pool)
        .await?;

    log::info!("Database migrations completed");
    Ok(())
}
