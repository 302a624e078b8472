use std::fs;
use std::path::Path;
use std::str::FromStr;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction, query};

use crate::config::DatabaseConfig;

/// Handle on the share database.
///
/// Callers open short-lived units of work with [`Database::scoped_session`] or
/// [`Database::connection`] and drop them before any slow cloud call.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect using the given configuration and initialize the schema.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        log::info!("Connecting to share database with DSN: {}", config.dsn);

        Self::ensure_data_directory(&config.dsn).map_err(sqlx::Error::Io)?;

        let options = SqliteConnectOptions::from_str(&config.dsn)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `sqlite::memory:` is its own database
        let max_connections = if config.is_in_memory() {
            1
        } else {
            config.max_connections.max(1)
        };

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            // Closing the only connection would drop the database with it
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| {
                log::error!("Failed to connect to database with DSN '{}': {e}", config.dsn);
                e
            })?;

        let database = Database { pool };
        database.init().await.map_err(|e| {
            log::error!("Failed to initialize share schema: {e}");
            e
        })?;
        log::info!("Share schema initialized successfully");
        Ok(database)
    }

    /// Fresh in-memory database, mostly for tests.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        Self::new(&DatabaseConfig::in_memory()).await
    }

    /// Begin a unit of work. Nothing is persisted unless the transaction is committed.
    pub async fn scoped_session(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Borrow a single connection for autocommitted writes.
    pub async fn connection(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn ensure_data_directory(dsn: &str) -> std::io::Result<()> {
        if dsn.contains(":memory:") {
            return Ok(());
        }

        let Some(file_path) = dsn
            .strip_prefix("sqlite://")
            .or_else(|| dsn.strip_prefix("sqlite:"))
        else {
            return Ok(());
        };
        let file_path = file_path.split('?').next().unwrap_or(file_path);

        if let Some(parent) = Path::new(file_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
            log::info!("Created data directory: {}", parent.display());
        }
        Ok(())
    }

    /// Create tables if they do not exist.
    async fn init(&self) -> Result<(), sqlx::Error> {
        let create_environments = r#"
        CREATE TABLE IF NOT EXISTS environments (
            environment_uri TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            aws_account_id TEXT NOT NULL,
            region TEXT NOT NULL
        )"#;
        query(create_environments).execute(&self.pool).await?;

        let create_environment_groups = r#"
        CREATE TABLE IF NOT EXISTS environment_groups (
            group_uri TEXT NOT NULL,
            environment_uri TEXT NOT NULL REFERENCES environments(environment_uri),
            environment_iam_role_arn TEXT NOT NULL,
            environment_iam_role_name TEXT NOT NULL,
            PRIMARY KEY (group_uri, environment_uri)
        )"#;
        query(create_environment_groups).execute(&self.pool).await?;

        let create_datasets = r#"
        CREATE TABLE IF NOT EXISTS datasets (
            dataset_uri TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            environment_uri TEXT NOT NULL REFERENCES environments(environment_uri),
            admin_group TEXT NOT NULL,
            aws_account_id TEXT NOT NULL,
            region TEXT NOT NULL,
            glue_database_name TEXT NOT NULL,
            s3_bucket_name TEXT NOT NULL,
            kms_alias TEXT
        )"#;
        query(create_datasets).execute(&self.pool).await?;

        let create_dataset_tables = r#"
        CREATE TABLE IF NOT EXISTS dataset_tables (
            table_uri TEXT PRIMARY KEY,
            dataset_uri TEXT NOT NULL REFERENCES datasets(dataset_uri),
            glue_database_name TEXT NOT NULL,
            glue_table_name TEXT NOT NULL,
            s3_prefix TEXT NOT NULL
        )"#;
        query(create_dataset_tables).execute(&self.pool).await?;

        let create_storage_locations = r#"
        CREATE TABLE IF NOT EXISTS dataset_storage_locations (
            location_uri TEXT PRIMARY KEY,
            dataset_uri TEXT NOT NULL REFERENCES datasets(dataset_uri),
            label TEXT NOT NULL,
            s3_prefix TEXT NOT NULL
        )"#;
        query(create_storage_locations).execute(&self.pool).await?;

        let create_share_objects = r#"
        CREATE TABLE IF NOT EXISTS share_objects (
            share_uri TEXT PRIMARY KEY,
            dataset_uri TEXT NOT NULL REFERENCES datasets(dataset_uri),
            environment_uri TEXT NOT NULL REFERENCES environments(environment_uri),
            group_uri TEXT NOT NULL,
            owner TEXT NOT NULL,
            status TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        )"#;
        query(create_share_objects).execute(&self.pool).await?;

        let create_share_items = r#"
        CREATE TABLE IF NOT EXISTS share_object_items (
            share_item_uri TEXT PRIMARY KEY,
            share_uri TEXT NOT NULL REFERENCES share_objects(share_uri),
            item_type TEXT NOT NULL,
            item_uri TEXT NOT NULL,
            item_name TEXT NOT NULL,
            status TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL,
            UNIQUE (share_uri, item_uri)
        )"#;
        query(create_share_items).execute(&self.pool).await?;

        let create_item_status_index = r#"
        CREATE INDEX IF NOT EXISTS share_object_items_status
            ON share_object_items (share_uri, status)"#;
        query(create_item_status_index).execute(&self.pool).await?;

        Ok(())
    }
}
