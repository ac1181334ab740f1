//! Bulk loader.
//!
//! Reads one header-first, comma-delimited source per table and inserts its rows one statement at a time, in the
//! schema's create order so that every referenced row exists before the rows pointing at it.
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use comfy_table::CellAlignment;
use csv::ReaderBuilder;
use csv::StringRecord;
use csv::Trim;
use tracing::info;
use tracing::instrument;

use crate::crud::Crud;
use crate::entity::Customer;
use crate::entity::EntityKind;
use crate::entity::Order;
use crate::entity::Product;
use crate::entity::Record;
use crate::error::LoaderError;
use crate::error::Result;
use crate::progress::MaybeProgress;
use crate::progress::ProgressUI;
use crate::schema::Schema;

/// Rows loaded per table.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    entries: Vec<(&'static str, u64, Duration)>,
}

impl LoadReport {
    pub fn push(&mut self, table: &'static str, rows: u64, elapsed: Duration) {
        self.entries.push((table, rows, elapsed));
    }

    pub fn rows(&self, table: &str) -> Option<u64> {
        self.entries.iter().find(|(t, ..)| *t == table).map(|(_, rows, _)| *rows)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, rows, _)| rows).sum()
    }

    pub fn tables(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(t, ..)| *t).collect()
    }

    pub fn summary_table(&self) -> comfy_table::Table {
        let mut table = comfy_table::Table::new();
        table
            .load_preset(comfy_table::presets::ASCII_FULL_CONDENSED)
            .set_header(["Table", "Rows", "Time (s)"]);

        for (name, rows, elapsed) in &self.entries {
            table.add_row([
                name.to_string(),
                rows.to_string(),
                format!("{:.2}", elapsed.as_secs_f64()),
            ]);
        }

        for col in 1..=2 {
            if let Some(column) = table.column_mut(col) {
                column.set_cell_alignment(CellAlignment::Right);
            }
        }

        table
    }
}

#[derive(Debug)]
pub struct BulkLoader {
    data_dir: PathBuf,
    ui:       Option<Arc<ProgressUI>>,
}

impl BulkLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ui:       None,
        }
    }

    pub fn with_ui(mut self, ui: Arc<ProgressUI>) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn source_path(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// Load every table of `schema`, parents first. Stops at the first failure; whatever was inserted before it
    /// stays.
    #[instrument(level = "debug", skip_all, fields(data_dir = %self.data_dir.display()))]
    pub async fn load_all(&self, crud: &mut Crud, schema: &Schema) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for table in schema.create_order()? {
            let kind = EntityKind::for_table(table.name).ok_or_else(|| LoaderError::UnknownTable(table.name.into()))?;
            self.report_info(format!("Now loading {} data...", kind.table()));

            let started = Instant::now();
            let rows = self.load_kind(crud, kind).await?;
            report.push(kind.table(), rows, started.elapsed());
        }

        Ok(report)
    }

    pub async fn load_kind(&self, crud: &mut Crud, kind: EntityKind) -> Result<u64> {
        let path = self.source_path(kind);
        match kind {
            EntityKind::Customers => self.load_file::<Customer>(crud, &path).await,
            EntityKind::Products => self.load_file::<Product>(crud, &path).await,
            EntityKind::Orders => self.load_file::<Order>(crud, &path).await,
        }
    }

    async fn load_file<R: Record>(&self, crud: &mut Crud, path: &Path) -> Result<u64> {
        let file = File::open(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let progress = self.ui.as_ref().and_then(|ui| ui.acquire_progress(R::TABLE));
        let outcome = load_records::<R, _>(crud, file, &path.display().to_string(), &progress).await;

        match &outcome {
            Ok(rows) => {
                progress.maybe_finish_with_message("done");
                info!("Loaded {rows} row(s) into '{}' from {}", R::TABLE, path.display());
            }
            Err(err) => progress.maybe_abandon_with_message(format!("failed: {err}")),
        }

        outcome
    }

    fn report_info(&self, msg: String) {
        if let Some(ui) = &self.ui {
            ui.report_info(&msg);
        }
        info!("{msg}");
    }
}

/// Insert every data row of `reader` into `R::TABLE`. The first row is the header and is skipped, its content is
/// not consulted. A row with the wrong number of fields aborts the load.
pub async fn load_records<R, Rd>(
    crud: &mut Crud,
    reader: Rd,
    source_name: &str,
    progress: &Option<indicatif::ProgressBar>,
) -> Result<u64>
where
    R: Record,
    Rd: Read,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut record = StringRecord::new();
    let mut loaded = 0;

    while rdr.read_record(&mut record)? {
        let line = record.position().map_or(0, |p| p.line());

        if record.len() != R::COLUMNS.len() {
            return Err(LoaderError::RowShape {
                source_name: source_name.to_string(),
                line,
                expected: R::COLUMNS.len(),
                found: record.len(),
            });
        }

        let row: R = record.deserialize(None).map_err(|e| LoaderError::InvalidRow {
            source_name: source_name.to_string(),
            line,
            reason: e.to_string(),
        })?;

        crud.insert(R::TABLE, R::COLUMNS, row.into_values()).await?;
        loaded += 1;
        progress.maybe_inc(1);
    }

    Ok(loaded)
}
