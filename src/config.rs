//! Connection settings shared by the session and the drivers.
use std::fmt::Display;
use std::path::PathBuf;

use fieldx::fxstruct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    Sqlite,
    #[value(alias = "pg")]
    Postgres,
    Mysql,
}

impl Backend {
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Backend::Sqlite => None,
            Backend::Postgres => Some(5432),
            Backend::Mysql => Some(3306),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Postgres => write!(f, "postgres"),
            Backend::Mysql => write!(f, "mysql"),
        }
    }
}

/// Credentials and the target database of a session.
///
/// For SQLite the "server" is a directory and every database is a `<name>.db` file in it; `host`, `user` and
/// `password` are ignored.
#[derive(Clone)]
#[fxstruct(no_new, get)]
pub struct ConnectionConfig {
    #[fieldx(get(copy))]
    backend:    Backend,
    host:       String,
    #[fieldx(get(copy))]
    port:       Option<u16>,
    user:       String,
    password:   String,
    database:   String,
    sqlite_dir: PathBuf,
}

impl ConnectionConfig {
    pub fn new<S: ToString>(backend: Backend, host: S, user: S, password: S, database: S) -> Self {
        Self {
            backend,
            host: host.to_string(),
            port: None,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            sqlite_dir: PathBuf::from("."),
        }
    }

    pub fn sqlite<S: ToString>(dir: impl Into<PathBuf>, database: S) -> Self {
        Self {
            backend:    Backend::Sqlite,
            host:       String::new(),
            port:       None,
            user:       String::new(),
            password:   String::new(),
            database:   database.to_string(),
            sqlite_dir: dir.into(),
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_sqlite_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sqlite_dir = dir.into();
        self
    }

    pub fn effective_port(&self) -> u16 {
        self.port.or(self.backend.default_port()).unwrap_or_default()
    }

    /// Server URL for `scheme`, optionally pointing at `database`. The password is percent-encoded.
    pub(crate) fn server_url(&self, scheme: &str, database: Option<&str>) -> String {
        format!(
            "{scheme}://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.effective_port(),
            database.unwrap_or_default()
        )
    }

    /// Same as `server_url` but safe to log.
    pub(crate) fn redacted_url(&self, scheme: &str, database: Option<&str>) -> String {
        format!(
            "{scheme}://{}:***@{}:{}/{}",
            urlencoding::encode(&self.user),
            self.host,
            self.effective_port(),
            database.unwrap_or_default()
        )
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("sqlite_dir", &self.sqlite_dir)
            .finish()
    }
}
