//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;
use std::time::Duration;

use super::migrations;

/// How long a statement waits on another writer before failing with `SQLITE_BUSY`
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Database wrapper for a local libSQL store
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self { db, conn };
        database.configure(&database.conn).await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self { db, conn };
        database.configure(&database.conn).await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an additional configured connection to the same database file.
    ///
    /// In-memory databases hand out an independent empty database per connection.
    pub async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        self.configure(&conn).await?;
        Ok(conn)
    }

    /// Configure `SQLite` for a single local writer
    async fn configure(&self, conn: &Connection) -> Result<()> {
        // journal_mode and busy_timeout report their new value as a row
        conn.query("PRAGMA journal_mode = WAL;", ()).await.ok();
        conn.execute("PRAGMA synchronous = NORMAL;", ()).await.ok();
        conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        let busy_timeout = DEFAULT_BUSY_TIMEOUT.as_millis();
        conn.query(&format!("PRAGMA busy_timeout = {busy_timeout};"), ())
            .await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
