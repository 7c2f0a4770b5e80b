use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

pub type DbPool = SqlitePool;

pub const DATABASE_NAME: &str = "comments-db";

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("sqlx migrate error: {0}")]
    Migrate(#[from] MigrateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

impl fmt::Display for DbLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbLocation::File(path) => write!(f, "{}", path.display()),
            DbLocation::Memory => f.write_str(":memory:"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbOptions {
    pub location: DbLocation,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl DbOptions {
    /// `<dir>/comments-db.sqlite3`
    pub fn in_data_dir(dir: &Path) -> Self {
        Self::file(dir.join(format!("{DATABASE_NAME}.sqlite3")))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(path.into()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Private to one pool connection; gone once the pool is dropped.
    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::Memory,
            max_connections: 1,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

pub fn connect_lazy(options: &DbOptions) -> Result<DbPool, ConnectionError> {
    let pool = match &options.location {
        DbLocation::File(path) => {
            let connect = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(options.busy_timeout);
            SqlitePoolOptions::new()
                .max_connections(options.max_connections.max(1))
                .connect_lazy_with(connect)
        }
        DbLocation::Memory => {
            let connect = SqliteConnectOptions::from_str("sqlite::memory:")?
                .busy_timeout(options.busy_timeout);
            // Every new connection would be a fresh empty database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_lazy_with(connect)
        }
    };
    Ok(pool)
}

pub fn ensure_parent_dir(options: &DbOptions) -> Result<(), ConnectionError> {
    if let DbLocation::File(path) = &options.location {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
