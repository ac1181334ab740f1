//! Connection manager.
//!
//! A [`Session`] owns at most one live connection and tracks two facts about it: whether it is connected and
//! whether the target database is selected on it. [`Session::ready()`] repairs whichever of the two is missing, so
//! a statement never runs against a fresh server connection that has no database selected.
use std::fmt::Debug;

use sea_orm::DatabaseConnection;
use sea_orm::DbBackend;
use sea_orm::DbErr;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::config::ConnectionConfig;
use crate::driver::driver_for;
use crate::driver::DatabaseDriver;
use crate::error::LoaderError;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    DatabaseSelected,
    Closed,
}

pub struct Session {
    driver:            Box<dyn DatabaseDriver>,
    // The database `ready()` restores after a reconnect.
    target:            String,
    connection:        Option<DatabaseConnection>,
    database_selected: bool,
    closed:            bool,
}

impl Session {
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::with_driver(driver_for(config)?, config.database()))
    }

    pub fn with_driver<S: ToString>(driver: Box<dyn DatabaseDriver>, database: S) -> Self {
        Self {
            driver,
            target: database.to_string(),
            connection: None,
            database_selected: false,
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.connection, self.database_selected) {
            (Some(_), true) => SessionState::DatabaseSelected,
            (Some(_), false) => SessionState::Connected,
            (None, _) if self.closed => SessionState::Closed,
            (None, _) => SessionState::Unconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn database_selected(&self) -> bool {
        self.connection.is_some() && self.database_selected
    }

    pub fn driver(&self) -> &dyn DatabaseDriver {
        self.driver.as_ref()
    }

    pub fn backend(&self) -> DbBackend {
        self.driver.backend()
    }

    pub fn target_database(&self) -> &str {
        &self.target
    }

    /// Open a new server-level connection, replacing any existing one. The database selection does not survive
    /// this.
    #[instrument(level = "debug", skip(self), fields(driver = self.driver.name()))]
    pub async fn connect(&mut self) -> Result<&DatabaseConnection> {
        if let Some(old) = self.connection.take() {
            let _ = old.close().await;
        }
        self.database_selected = false;

        let conn = self.driver.connect().await?;
        self.driver.configure(&conn).await?;
        info!("Connected to {}", self.driver.display_url(None));

        self.closed = false;
        Ok(self.connection.insert(conn))
    }

    /// Create `name` if it doesn't exist and make it the active database. Connects first when needed. Safe to call
    /// any number of times.
    #[instrument(level = "debug", skip(self), fields(driver = self.driver.name()))]
    pub async fn ensure_database(&mut self, name: &str) -> Result<()> {
        if self.connection.is_none() {
            self.connect().await?;
        }

        let Some(conn) = self.connection.take()
        else {
            return Err(self.not_connected());
        };

        if let Err(err) = self.driver.create_database(&conn, name).await {
            self.connection = Some(conn);
            return Err(err);
        }
        info!("Database '{name}' created or already exists");

        let conn = self.driver.select_database(conn, name).await?;
        self.connection = Some(conn);
        self.database_selected = true;
        self.target = name.to_string();
        info!("Now using database: {name}");

        Ok(())
    }

    /// Connection with the target database selected, establishing whatever is missing.
    pub async fn ready(&mut self) -> Result<&DatabaseConnection> {
        if self.connection.is_none() {
            debug!("No live connection, reconnecting");
            self.connect().await?;
        }

        if !self.database_selected {
            let target = self.target.clone();
            self.ensure_database(&target).await?;
        }

        match self.connection {
            Some(ref conn) => Ok(conn),
            None => Err(self.not_connected()),
        }
    }

    /// Turn a driver error into a [`LoaderError`]; a lost connection is forgotten so the next call reconnects.
    pub(crate) fn statement_failed(&mut self, err: DbErr, sql: &str) -> LoaderError {
        let err = LoaderError::from_db_err(err, sql, &self.driver.display_url(Some(&self.target)));
        if err.is_connection() {
            warn!("Connection lost: {err}");
            self.connection = None;
            self.database_selected = false;
        }
        err
    }

    /// Release the connection. Without one this does nothing.
    #[instrument(level = "debug", skip(self))]
    pub async fn close(&mut self) -> Result<()> {
        let Some(conn) = self.connection.take()
        else {
            return Ok(());
        };

        self.database_selected = false;
        self.closed = true;

        conn.close().await.map_err(|source| LoaderError::Connection {
            url: self.driver.display_url(Some(&self.target)),
            source,
        })?;
        info!("Connection closed");

        Ok(())
    }

    fn not_connected(&self) -> LoaderError {
        LoaderError::Connection {
            url:    self.driver.display_url(None),
            source: DbErr::Custom("no live connection".to_string()),
        }
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.driver.name())
            .field("target", &self.target)
            .field("state", &self.state())
            .finish()
    }
}
