//! Dialect-specific parts of the connection life cycle.
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "pg")]
pub mod pg;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::ConnectOptions;
use sea_orm::DatabaseConnection;
use sea_orm::DbBackend;

use crate::config::Backend;
use crate::config::ConnectionConfig;
use crate::error::LoaderError;
use crate::error::Result;

/// A driver knows how to reach a server, how to make sure a database exists on it and how to make that database
/// the active one.
#[async_trait]
pub trait DatabaseDriver: Debug + Sync + Send + 'static {
    /// Return driver name.
    fn name(&self) -> &'static str;

    fn backend(&self) -> DbBackend;

    /// Open a server-level connection with no database selected.
    async fn connect(&self) -> Result<DatabaseConnection>;

    /// Per-connection settings applied right after a connection is opened.
    async fn configure(&self, _conn: &DatabaseConnection) -> Result<()> {
        Ok(())
    }

    /// Create `name` unless it already exists.
    async fn create_database(&self, conn: &DatabaseConnection, name: &str) -> Result<()>;

    /// Make `name` the active database. Drivers which cannot switch databases on a live connection return a new
    /// one; the old connection is consumed either way.
    async fn select_database(&self, conn: DatabaseConnection, name: &str) -> Result<DatabaseConnection>;

    /// URL of the current target, safe to show to a user.
    fn display_url(&self, database: Option<&str>) -> String;

    /// Positional parameter marker for the 1-based `index`.
    fn placeholder(&self, index: usize) -> String {
        match self.backend() {
            DbBackend::Postgres => format!("${index}"),
            _ => "?".to_string(),
        }
    }
}

/// Connection options for a session: exactly one connection, no pooling.
pub(crate) fn single_connection(url: &str) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .test_before_acquire(true)
        .sqlx_logging(false);
    opts
}

pub(crate) async fn open(url: &str, display_url: String) -> Result<DatabaseConnection> {
    sea_orm::Database::connect(single_connection(url))
        .await
        .map_err(|source| LoaderError::Connection {
            url: display_url,
            source,
        })
}

/// Instantiate the driver for the configured backend.
pub fn driver_for(config: &ConnectionConfig) -> Result<Box<dyn DatabaseDriver>> {
    match config.backend() {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Box::new(sqlite::Sqlite::new(config.sqlite_dir().clone()))),
        #[cfg(feature = "pg")]
        Backend::Postgres => Ok(Box::new(pg::Pg::new(config.clone()))),
        #[cfg(feature = "mysql")]
        Backend::Mysql => Ok(Box::new(mysql::Mysql::new(config.clone()))),
        #[allow(unreachable_patterns)]
        backend => Err(LoaderError::Config(format!(
            "{backend} support is not enabled. Rebuild with `--features {}`.",
            feature_name(backend)
        ))),
    }
}

pub fn feature_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Sqlite => "sqlite",
        Backend::Postgres => "pg",
        Backend::Mysql => "mysql",
    }
}

pub fn feature_enabled(backend: Backend) -> bool {
    match backend {
        Backend::Sqlite => cfg!(feature = "sqlite"),
        Backend::Postgres => cfg!(feature = "pg"),
        Backend::Mysql => cfg!(feature = "mysql"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fake(DbBackend);

    #[async_trait]
    impl DatabaseDriver for Fake {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn backend(&self) -> DbBackend {
            self.0
        }

        async fn connect(&self) -> Result<DatabaseConnection> {
            Ok(DatabaseConnection::Disconnected)
        }

        async fn create_database(&self, _conn: &DatabaseConnection, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn select_database(&self, conn: DatabaseConnection, _name: &str) -> Result<DatabaseConnection> {
            Ok(conn)
        }

        fn display_url(&self, _database: Option<&str>) -> String {
            "fake://".into()
        }
    }

    #[test]
    fn placeholders_follow_dialect() {
        assert_eq!(Fake(DbBackend::Postgres).placeholder(3), "$3");
        assert_eq!(Fake(DbBackend::MySql).placeholder(3), "?");
        assert_eq!(Fake(DbBackend::Sqlite).placeholder(1), "?");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_driver_is_available() {
        let config = ConnectionConfig::sqlite("/tmp", "shop");
        let driver = driver_for(&config).expect("sqlite driver");
        assert_eq!(driver.name(), "sqlite");
    }
}
