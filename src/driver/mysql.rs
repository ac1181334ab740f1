use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use sea_orm::DbBackend;

use super::open;
use super::DatabaseDriver;
use crate::config::ConnectionConfig;
use crate::error::LoaderError;
use crate::error::Result;

#[derive(Debug)]
#[fxstruct(sync, no_new, get)]
pub struct Mysql {
    config: ConnectionConfig,
}

impl Mysql {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    async fn run(&self, conn: &DatabaseConnection, sql: &str) -> Result<()> {
        conn.execute_unprepared(sql)
            .await
            .map_err(|e| LoaderError::from_db_err(e, sql, &self.display_url(None)))?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseDriver for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn backend(&self) -> DbBackend {
        DbBackend::MySql
    }

    async fn connect(&self) -> Result<DatabaseConnection> {
        open(&self.config.server_url("mysql", None), self.display_url(None)).await
    }

    async fn create_database(&self, conn: &DatabaseConnection, name: &str) -> Result<()> {
        self.run(conn, &format!("CREATE DATABASE IF NOT EXISTS `{name}`")).await
    }

    async fn select_database(&self, conn: DatabaseConnection, name: &str) -> Result<DatabaseConnection> {
        self.run(&conn, &format!("USE `{name}`")).await?;
        // The pool may recycle its connection at any time; a URL-scoped session keeps the selection across that.
        let _ = conn.close().await;
        open(&self.config.server_url("mysql", Some(name)), self.display_url(Some(name))).await
    }

    fn display_url(&self, database: Option<&str>) -> String {
        self.config.redacted_url("mysql", database)
    }
}
