//! The `crud-loader` command: create the target database, rebuild the shop schema, load the CSV sources.
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::CommandFactory;
use clap::Parser;
use fieldx::fxstruct;
use garde::Validate;
use tracing::info;
use tracing::instrument;

use crate::config::Backend;
use crate::config::ConnectionConfig;
use crate::crud::Crud;
use crate::driver::feature_enabled;
use crate::driver::feature_name;
use crate::loader::BulkLoader;
use crate::loader::LoadReport;
use crate::progress::ProgressUI;
use crate::schema::Schema;
use crate::session::Session;

#[derive(Debug, Clone, clap::Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "crud-loader")]
pub struct Cli {
    /// Database backend
    #[clap(long, env = "DB_BACKEND", value_enum, default_value_t = Backend::Sqlite)]
    #[garde(custom(Self::compiled_in))]
    backend: Backend,

    /// Database server host
    #[clap(long, env = "DB_HOST", default_value = "localhost")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    host: String,

    /// Database server port, the backend's default if omitted
    #[clap(long, env = "DB_PORT")]
    #[garde(skip)]
    port: Option<u16>,

    #[clap(long, env = "DB_USER", default_value = "loader")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    user: String,

    #[clap(long, env = "DB_PASSWORD", hide_env_values = true, default_value = "")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    password: String,

    /// Database to create if missing and to load into
    #[clap(long, env = "DB_NAME", default_value = "shop")]
    #[fieldx(get(clone))]
    #[garde(custom(Self::identifier))]
    database: String,

    /// Directory holding SQLite database files
    #[clap(long, env = "DB_SQLITE_DIR", default_value = ".")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    sqlite_dir: PathBuf,

    /// Directory with customers.csv, products.csv and orders.csv
    #[clap(long, env = "LOADER_DATA_DIR", default_value = ".")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    data_dir: PathBuf,

    /// Only make sure the database exists, do not touch tables
    #[clap(long, default_value_t = false)]
    #[garde(skip)]
    setup_only: bool,

    #[clap(long, short, env = "LOADER_QUIET", default_value_t = false)]
    #[garde(skip)]
    quiet: bool,

    /// File to send log into
    #[clap(long, env = "LOADER_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn compiled_in(value: &Backend, _: &()) -> garde::Result {
        if feature_enabled(*value) {
            Ok(())
        }
        else {
            Err(garde::Error::new(format!(
                "Build feature '{}' must be enabled to use {value}",
                feature_name(*value)
            )))
        }
    }

    fn identifier(value: &String, _: &()) -> garde::Result {
        let mut chars = value.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid {
            Ok(())
        }
        else {
            Err(garde::Error::new(format!(
                "'{value}' is not a valid database name; use letters, digits and underscores"
            )))
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        match self.backend {
            Backend::Sqlite => ConnectionConfig::sqlite(self.sqlite_dir.clone(), &self.database),
            backend => ConnectionConfig::new(backend, &self.host, &self.user, &self.password, &self.database)
                .with_port(self.port)
                .with_sqlite_dir(self.sqlite_dir.clone()),
        }
    }
}

#[derive(Debug)]
pub struct LoaderApp {
    cli: Cli,
    ui:  Arc<ProgressUI>,
}

impl LoaderApp {
    pub fn new(cli: Cli) -> Self {
        let ui = Arc::new(ProgressUI::new(cli.quiet()));
        Self { cli, ui }
    }

    pub fn from_args<S: ToString>(args: Vec<S>) -> Result<Self, clap::Error> {
        Ok(Self::new(Cli::try_parse_from(args.into_iter().map(|s| s.to_string()))?))
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    fn validate(&self) -> Result<(), clap::Error> {
        self.cli
            .validate()
            .map_err(|err| Cli::command().error(ErrorKind::InvalidValue, err))
    }

    fn setup_tracing(&self) -> anyhow::Result<()> {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

        let dest_writer = Mutex::new(if let Some(log_file) = self.cli.log_file() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(log_file)?;
            Box::new(file) as Box<dyn io::Write + Send>
        }
        else {
            Box::new(io::stderr()) as Box<dyn io::Write + Send>
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(dest_writer))
            .try_init()?;

        info!("Tracing initialized");

        Ok(())
    }

    /// Run the pipeline. Returns the load report, or `None` with `--setup-only`. The session is closed whether the
    /// pipeline succeeds or not.
    pub async fn execute(&self) -> anyhow::Result<Option<LoadReport>> {
        self.validate()?;

        let config = self.cli.connection_config();
        let mut crud = Crud::new(Session::new(&config)?);

        let outcome = self.pipeline(&mut crud).await;
        let closed = crud.close().await;

        match outcome {
            Ok(report) => {
                closed?;
                if let Some(report) = &report {
                    self.ui
                        .report_info(format!("Data loading complete.\n{}", report.summary_table()));
                }
                Ok(report)
            }
            Err(err) => {
                self.ui.report_error(&err);
                Err(err.into())
            }
        }
    }

    #[instrument(level = "debug", skip_all, fields(backend = %self.cli.backend()))]
    async fn pipeline(&self, crud: &mut Crud) -> crate::error::Result<Option<LoadReport>> {
        let database = self.cli.database();

        self.ui.report_info("Starting data loading process...");
        let session = crud.session_mut();
        session.connect().await?;
        session.ensure_database(&database).await?;
        self.ui.report_info(format!("Now using database: {database}"));

        if self.cli.setup_only() {
            self.ui.report_info("Database setup is complete");
            return Ok(None);
        }

        let schema = Schema::shop();
        self.ui.report_info("Dropping existing tables if they exist...");
        schema.drop_all(crud).await?;
        self.ui.report_info("Creating new tables...");
        schema.create_all(crud).await?;

        let loader = BulkLoader::new(self.cli.data_dir()).with_ui(self.ui.clone());
        Ok(Some(loader.load_all(crud, &schema).await?))
    }

    pub async fn run() -> anyhow::Result<()> {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    err.print()?;
                    return Ok(());
                }
                _ => err.exit(),
            },
        };

        let app = LoaderApp::new(cli);
        app.setup_tracing()?;
        app.execute().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let app = LoaderApp::from_args(vec!["crud-loader", "--backend", "sqlite", "--database", "shop"]).unwrap();
        let cli = app.cli();
        assert_eq!(cli.backend(), Backend::Sqlite);
        assert_eq!(cli.database(), "shop");
        assert!(!cli.setup_only());
        assert!(app.validate().is_ok());
    }

    #[test]
    fn server_settings_reach_the_config() {
        let app = LoaderApp::from_args(vec![
            "crud-loader",
            "--backend",
            "pg",
            "--host",
            "db.local",
            "--port",
            "6543",
            "--user",
            "loader",
            "--password",
            "secret",
            "--database",
            "shop_test",
        ])
        .unwrap();
        let config = app.cli().connection_config();
        assert_eq!(config.backend(), Backend::Postgres);
        assert_eq!(config.host(), "db.local");
        assert_eq!(config.effective_port(), 6543);
        assert_eq!(config.database(), "shop_test");
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn database_name_must_be_an_identifier() {
        for bad in ["", "1shop", "shop-db", "shop; DROP"] {
            let app =
                LoaderApp::from_args(vec!["crud-loader", "--backend", "sqlite", "--database", bad]).unwrap();
            assert!(app.validate().is_err(), "'{bad}' should be rejected");
        }
    }

    #[cfg(not(feature = "mysql"))]
    #[test]
    fn disabled_backend_is_rejected() {
        let app = LoaderApp::from_args(vec!["crud-loader", "--backend", "mysql"]).unwrap();
        let err = app.validate().unwrap_err();
        assert!(err.to_string().contains("mysql"));
    }
}
