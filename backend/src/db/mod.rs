pub mod catalog;
pub mod catalog_models;
pub mod catalog_schema;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use parking_lot::Mutex;
use anyhow::{anyhow, Context, Result};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::logger::info;

pub use crate::db::catalog::CatalogDbHandle;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const CATALOG_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/catalog");

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Debug)]
pub struct DatabaseHandle {
    pool: SqlitePool,
    pub write_lock: Mutex<()>,
}

impl DatabaseHandle {
    pub fn new(database_url: &str) -> Result<Self> {
        info(&format!("DatabaseHandle::new() {}", database_url));
        let manager = ConnectionManager::new(database_url);
        let pool = Pool::builder()
            .max_size(5)
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)
            .with_context(|| format!("Failed to create pool for: {}", database_url))?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    pub fn get_conn(&self) -> Result<DbConn, CatalogError> {
        Ok(self.pool.get()?)
    }

    pub fn run_migrations(&self) -> Result<()> {
        let _lock = self.write_lock.lock();
        let mut db_conn = self.pool.get()
            .context("Failed to get connection from pool for migrations")?;
        db_conn.run_pending_migrations(CATALOG_MIGRATIONS)
            .map_err(|e| anyhow!("Failed to run catalog migrations: {}", e))?;
        Ok(())
    }

    /// Performs a write operation on the database, guarded by a Mutex write_lock.
    pub fn do_write<F, T>(&self, operation: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, CatalogError>,
    {
        let _lock = self.write_lock.lock();
        let mut db_conn = self.pool.get()?;
        operation(&mut db_conn)
    }

    /// Performs a read operation on the database.
    pub fn do_read<F, T>(&self, operation: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, CatalogError>,
    {
        let mut db_conn = self.pool.get()?;
        operation(&mut db_conn)
    }
}

/// Open the catalog database named by the config and bring its schema up to date.
pub fn open_catalog(config: &CatalogConfig) -> Result<CatalogDbHandle> {
    let database_url = config.database_url();
    let handle = DatabaseHandle::new(&database_url)?;
    handle.run_migrations()?;
    Ok(handle)
}
