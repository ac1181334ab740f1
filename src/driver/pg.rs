use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use sea_orm::DbBackend;
use sea_orm::Statement;
use sea_orm::Value;
use tracing::debug;

use super::open;
use super::DatabaseDriver;
use crate::config::ConnectionConfig;
use crate::error::LoaderError;
use crate::error::Result;

// Server-level sessions land on the maintenance database; PostgreSQL always needs one.
const MAINTENANCE_DB: &str = "postgres";

#[derive(Debug)]
#[fxstruct(sync, no_new, get)]
pub struct Pg {
    config: ConnectionConfig,
}

impl Pg {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DatabaseDriver for Pg {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn backend(&self) -> DbBackend {
        DbBackend::Postgres
    }

    async fn connect(&self) -> Result<DatabaseConnection> {
        open(
            &self.config.server_url("postgres", Some(MAINTENANCE_DB)),
            self.display_url(Some(MAINTENANCE_DB)),
        )
        .await
    }

    async fn create_database(&self, conn: &DatabaseConnection, name: &str) -> Result<()> {
        // No IF NOT EXISTS for databases here, consult the catalog instead.
        let lookup = "SELECT 1 FROM pg_database WHERE datname = $1";
        let exists = conn
            .query_one(Statement::from_sql_and_values(DbBackend::Postgres, lookup, [Value::from(name)]))
            .await
            .map_err(|e| LoaderError::from_db_err(e, lookup, &self.display_url(None)))?
            .is_some();

        if exists {
            debug!("Database '{name}' already exists");
            return Ok(());
        }

        let sql = format!("CREATE DATABASE \"{name}\"");
        conn.execute_unprepared(&sql)
            .await
            .map_err(|e| LoaderError::from_db_err(e, &sql, &self.display_url(None)))?;
        Ok(())
    }

    async fn select_database(&self, conn: DatabaseConnection, name: &str) -> Result<DatabaseConnection> {
        let _ = conn.close().await;
        open(&self.config.server_url("postgres", Some(name)), self.display_url(Some(name))).await
    }

    fn display_url(&self, database: Option<&str>) -> String {
        self.config.redacted_url("postgres", database)
    }
}
