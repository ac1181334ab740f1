use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use sea_orm::DbBackend;
use sea_orm::DbErr;
use sea_orm::RuntimeErr;
use tracing::debug;

use super::open;
use super::DatabaseDriver;
use crate::error::LoaderError;
use crate::error::Result;

/// SQLite has no server: the configured directory plays its role and each database is a `<name>.db` file in it.
#[derive(Debug)]
#[fxstruct(sync, no_new, get)]
pub struct Sqlite {
    dir: PathBuf,
}

impl Sqlite {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn db_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.db"))
    }

    fn url(path: &Path, mode: &str) -> String {
        format!("sqlite://{}?mode={mode}", path.display())
    }
}

#[async_trait]
impl DatabaseDriver for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn backend(&self) -> DbBackend {
        DbBackend::Sqlite
    }

    async fn connect(&self) -> Result<DatabaseConnection> {
        if !self.dir.is_dir() {
            return Err(LoaderError::Connection {
                url:    self.display_url(None),
                source: DbErr::Conn(RuntimeErr::Internal(format!(
                    "database directory {} does not exist",
                    self.dir.display()
                ))),
            });
        }
        open("sqlite::memory:", self.display_url(None)).await
    }

    async fn configure(&self, conn: &DatabaseConnection) -> Result<()> {
        conn.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .map_err(|e| LoaderError::from_db_err(e, "PRAGMA foreign_keys = ON", &self.display_url(None)))?;
        Ok(())
    }

    async fn create_database(&self, _conn: &DatabaseConnection, name: &str) -> Result<()> {
        let path = self.db_path(name);
        if path.exists() {
            debug!("SQLite database {} already exists", path.display());
            return Ok(());
        }
        // Opening in rwc mode creates the file.
        let created = open(&Self::url(&path, "rwc"), self.display_url(Some(name))).await?;
        let _ = created.close().await;
        debug!("Created SQLite database {}", path.display());
        Ok(())
    }

    async fn select_database(&self, conn: DatabaseConnection, name: &str) -> Result<DatabaseConnection> {
        let _ = conn.close().await;
        let selected = open(&Self::url(&self.db_path(name), "rw"), self.display_url(Some(name))).await?;
        self.configure(&selected).await?;
        Ok(selected)
    }

    fn display_url(&self, database: Option<&str>) -> String {
        match database {
            Some(name) => format!("sqlite://{}", self.db_path(name).display()),
            None => format!("sqlite://{}", self.dir.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_database_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Sqlite::new(dir.path().to_path_buf());
        let conn = driver.connect().await.unwrap();

        driver.create_database(&conn, "shop").await.unwrap();
        assert!(driver.db_path("shop").exists());
        driver.create_database(&conn, "shop").await.unwrap();

        let selected = driver.select_database(conn, "shop").await.unwrap();
        selected.execute_unprepared("SELECT 1").await.unwrap();
    }

    #[tokio::test]
    async fn missing_directory_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Sqlite::new(dir.path().join("nope"));
        let err = driver.connect().await.unwrap_err();
        assert!(err.is_connection());
        assert!(matches!(err, LoaderError::Connection { ref url, .. } if url.ends_with("nope")));
    }
}
