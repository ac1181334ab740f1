//! Error types of the crate.
use std::fmt::Display;
use std::path::PathBuf;

use sea_orm::DbErr;
use sea_orm::RuntimeErr;
use sea_orm::SqlErr;
use thiserror::Error;

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;

/// What kind of server-side rejection a [`LoaderError::Statement`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    Other,
}

impl Display for StatementErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementErrorKind::UniqueViolation => write!(f, "unique constraint violation"),
            StatementErrorKind::ForeignKeyViolation => write!(f, "foreign key violation"),
            StatementErrorKind::Other => write!(f, "statement rejected"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The server is unreachable, credentials were rejected, or an established connection was lost.
    #[error("Connection to {url} failed: {source}")]
    Connection {
        url:    String,
        #[source]
        source: DbErr,
    },

    /// The server rejected a statement.
    #[error("{kind} while executing `{sql}`: {message}")]
    Statement {
        sql:     String,
        kind:    StatementErrorKind,
        message: String,
    },

    #[error("Table '{table}': {columns} column(s) given for {values} value(s)")]
    ParameterCount {
        table:   String,
        columns: usize,
        values:  usize,
    },

    #[error("{source_name}, line {line}: expected {expected} field(s), found {found}")]
    RowShape {
        source_name: String,
        line:        u64,
        expected:    usize,
        found:       usize,
    },

    #[error("{source_name}, line {line}: {reason}")]
    InvalidRow {
        source_name: String,
        line:        u64,
        reason:      String,
    },

    #[error("Empty condition would affect every row")]
    EmptyCondition,

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("No loader is registered for table '{0}'")]
    UnknownTable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot open {path:?}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl LoaderError {
    /// Classify a driver error raised while executing `sql`. Connectivity failures become
    /// [`LoaderError::Connection`], everything else is a [`LoaderError::Statement`].
    pub fn from_db_err(err: DbErr, sql: &str, url: &str) -> Self {
        if is_connection_lost(&err) {
            return LoaderError::Connection {
                url:    url.to_string(),
                source: err,
            };
        }

        let kind = match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StatementErrorKind::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => StatementErrorKind::ForeignKeyViolation,
            _ => StatementErrorKind::Other,
        };

        LoaderError::Statement {
            sql: sql.trim().to_string(),
            kind,
            message: err.to_string(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, LoaderError::Connection { .. })
    }

    pub fn statement_kind(&self) -> Option<StatementErrorKind> {
        match self {
            LoaderError::Statement { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub(crate) fn is_connection_lost(err: &DbErr) -> bool {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => {
            matches!(
                e,
                sea_orm::sqlx::Error::Io(_) | sea_orm::sqlx::Error::PoolClosed | sea_orm::sqlx::Error::PoolTimedOut
            )
        }
        _ => false,
    }
}
