//! Schema definer.
//!
//! Tables are declared as data. Foreign keys form a dependency graph from which the create order (parents first)
//! and the drop order (children first) are derived.
use std::collections::BTreeSet;
use std::fmt::Write;

use sea_orm::DbBackend;
use tracing::info;
use tracing::instrument;

use crate::crud::Crud;
use crate::error::LoaderError;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Varchar(u16),
    Decimal(u8, u8),
    DateTime,
}

impl ColumnType {
    pub fn sql(&self, backend: DbBackend) -> String {
        match (self, backend) {
            (ColumnType::Integer, DbBackend::Postgres) => "INTEGER".to_string(),
            (ColumnType::Integer, _) => "INT".to_string(),
            (ColumnType::Varchar(len), _) => format!("VARCHAR({len})"),
            // SQLite has no fixed-point type, values would land in REAL storage anyway.
            (ColumnType::Decimal(..), DbBackend::Sqlite) => "REAL".to_string(),
            (ColumnType::Decimal(precision, scale), _) => format!("DECIMAL({precision}, {scale})"),
            (ColumnType::DateTime, DbBackend::Postgres) => "TIMESTAMP".to_string(),
            (ColumnType::DateTime, _) => "DATETIME".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name:        &'static str,
    pub column_type: ColumnType,
    pub nullable:    bool,
    pub primary_key: bool,
}

impl ColumnSpec {
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub column:     &'static str,
    pub references: &'static str,
    pub ref_column: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name:         &'static str,
    pub columns:      Vec<ColumnSpec>,
    pub foreign_keys: Vec<ForeignKeySpec>,
}

impl TableSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, column: &'static str, references: &'static str, ref_column: &'static str) -> Self {
        self.foreign_keys.push(ForeignKeySpec {
            column,
            references,
            ref_column,
        });
        self
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Tables this one references, itself excluded.
    pub fn depends_on(&self) -> BTreeSet<&'static str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references)
            .filter(|t| *t != self.name)
            .collect()
    }

    /// The column and constraint block of `CREATE TABLE`, rendered for `backend`.
    pub fn definitions(&self, backend: DbBackend) -> String {
        let mut lines = Vec::with_capacity(self.columns.len() + self.foreign_keys.len());

        for column in &self.columns {
            let mut line = format!("{} {}", column.name, column.column_type.sql(backend));
            if column.primary_key {
                line.push_str(" PRIMARY KEY");
            }
            else if !column.nullable {
                line.push_str(" NOT NULL");
            }
            lines.push(line);
        }

        for fk in &self.foreign_keys {
            let mut line = String::new();
            let _ = write!(
                line,
                "FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, fk.references, fk.ref_column
            );
            lines.push(line);
        }

        lines.join(",\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: Vec<TableSpec>,
}

impl Schema {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self { tables }
    }

    /// Customers, products and orders; orders reference both of the other tables.
    pub fn shop() -> Self {
        Self::new(vec![
            TableSpec::new("customers")
                .column(ColumnSpec::new("customer_id", ColumnType::Integer).primary_key())
                .column(ColumnSpec::new("customer_name", ColumnType::Varchar(100)))
                .column(ColumnSpec::new("email", ColumnType::Varchar(100))),
            TableSpec::new("products")
                .column(ColumnSpec::new("product_id", ColumnType::Integer).primary_key())
                .column(ColumnSpec::new("product_name", ColumnType::Varchar(100)))
                .column(ColumnSpec::new("price", ColumnType::Decimal(10, 2))),
            TableSpec::new("orders")
                .column(ColumnSpec::new("id", ColumnType::Integer).primary_key())
                .column(ColumnSpec::new("date_time", ColumnType::DateTime))
                .column(ColumnSpec::new("customer_id", ColumnType::Integer))
                .column(ColumnSpec::new("product_id", ColumnType::Integer))
                .foreign_key("customer_id", "customers", "customer_id")
                .foreign_key("product_id", "products", "product_id"),
        ])
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Topological order, referenced tables before the tables referencing them. Among tables whose dependencies
    /// are all satisfied, declaration order wins, so the result is stable.
    pub fn create_order(&self) -> Result<Vec<&TableSpec>> {
        for table in &self.tables {
            for dep in table.depends_on() {
                if self.table(dep).is_none() {
                    return Err(LoaderError::Schema(format!(
                        "table '{}' references '{dep}' which is not part of the schema",
                        table.name
                    )));
                }
            }
        }

        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut order = Vec::with_capacity(self.tables.len());

        while order.len() < self.tables.len() {
            let next = self
                .tables
                .iter()
                .find(|t| !placed.contains(t.name) && t.depends_on().iter().all(|d| placed.contains(d)));

            match next {
                Some(table) => {
                    placed.insert(table.name);
                    order.push(table);
                }
                None => {
                    let stuck = self
                        .tables
                        .iter()
                        .filter(|t| !placed.contains(t.name))
                        .map(|t| t.name)
                        .collect::<Vec<_>>();
                    return Err(LoaderError::Schema(format!(
                        "foreign keys form a cycle among: {}",
                        stuck.join(", ")
                    )));
                }
            }
        }

        Ok(order)
    }

    /// Reverse of [`create_order`](Self::create_order): dependents go first.
    pub fn drop_order(&self) -> Result<Vec<&TableSpec>> {
        let mut order = self.create_order()?;
        order.reverse();
        Ok(order)
    }

    #[instrument(level = "debug", skip_all)]
    pub async fn drop_all(&self, crud: &mut Crud) -> Result<()> {
        for table in self.drop_order()? {
            crud.drop_table(table.name).await?;
            info!("Dropped table '{}' if it existed", table.name);
        }
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    pub async fn create_all(&self, crud: &mut Crud) -> Result<()> {
        let backend = crud.session().backend();
        for table in self.create_order()? {
            crud.create_table(table.name, &table.definitions(backend)).await?;
            info!("Table '{}' has been created", table.name);
        }
        Ok(())
    }

    /// Drop everything, then create everything.
    pub async fn recreate(&self, crud: &mut Crud) -> Result<()> {
        self.drop_all(crud).await?;
        self.create_all(crud).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tables: Vec<&TableSpec>) -> Vec<&'static str> {
        tables.into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn shop_orders() {
        let schema = Schema::shop();
        assert_eq!(
            names(schema.create_order().unwrap()),
            ["customers", "products", "orders"]
        );
        assert_eq!(names(schema.drop_order().unwrap()), ["orders", "products", "customers"]);
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let mut tables = Schema::shop().tables().to_vec();
        tables.reverse();
        let schema = Schema::new(tables);
        // orders was declared first but still comes last.
        assert_eq!(
            names(schema.create_order().unwrap()),
            ["products", "customers", "orders"]
        );
    }

    #[test]
    fn chains_are_followed() {
        let schema = Schema::new(vec![
            TableSpec::new("c").foreign_key("b_id", "b", "id"),
            TableSpec::new("b").foreign_key("a_id", "a", "id"),
            TableSpec::new("a"),
            TableSpec::new("tree").foreign_key("parent_id", "tree", "id"),
        ]);
        assert_eq!(names(schema.create_order().unwrap()), ["a", "b", "c", "tree"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let schema = Schema::new(vec![
            TableSpec::new("a").foreign_key("b_id", "b", "id"),
            TableSpec::new("b").foreign_key("a_id", "a", "id"),
            TableSpec::new("free"),
        ]);
        let err = schema.create_order().unwrap_err();
        assert!(matches!(err, LoaderError::Schema(ref msg) if msg.contains("a, b")));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let schema = Schema::new(vec![TableSpec::new("orders").foreign_key("customer_id", "customers", "id")]);
        assert!(matches!(schema.create_order(), Err(LoaderError::Schema(_))));
    }

    #[test]
    fn nullable_columns_skip_not_null() {
        let table = TableSpec::new("notes")
            .column(ColumnSpec::new("id", ColumnType::Integer).primary_key())
            .column(ColumnSpec::new("body", ColumnType::Varchar(255)).nullable())
            .column(ColumnSpec::new("created", ColumnType::DateTime));
        assert_eq!(
            table.definitions(DbBackend::Postgres),
            "id INTEGER PRIMARY KEY,\nbody VARCHAR(255),\ncreated TIMESTAMP NOT NULL"
        );
    }

    #[test]
    fn definitions_per_dialect() {
        let schema = Schema::shop();
        let orders = schema.table("orders").unwrap();

        assert_eq!(
            orders.definitions(DbBackend::MySql),
            "id INT PRIMARY KEY,\ndate_time DATETIME NOT NULL,\ncustomer_id INT NOT NULL,\nproduct_id INT NOT \
             NULL,\nFOREIGN KEY (customer_id) REFERENCES customers(customer_id),\nFOREIGN KEY (product_id) \
             REFERENCES products(product_id)"
        );
        assert!(orders
            .definitions(DbBackend::Postgres)
            .starts_with("id INTEGER PRIMARY KEY,\ndate_time TIMESTAMP NOT NULL"));

        let products = schema.table("products").unwrap();
        assert!(products.definitions(DbBackend::MySql).contains("price DECIMAL(10, 2) NOT NULL"));
        assert!(products.definitions(DbBackend::Sqlite).contains("price REAL NOT NULL"));
    }
}
