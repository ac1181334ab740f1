//! Generic CRUD operations over a [`Session`].
//!
//! Every statement is sent on its own and committed immediately by the server's autocommit; nothing here opens a
//! transaction. A failure in the middle of a series of calls leaves the earlier, already committed statements in
//! place.
//!
//! Only inserted values are bound as parameters. See [`crate::sql`] for the trust boundary of everything else.
use std::fmt::Display;

use sea_orm::ConnectionTrait;
use sea_orm::Statement;
use sea_orm::Value;
use tracing::debug;
use tracing::instrument;

use crate::error::LoaderError;
use crate::error::Result;
use crate::row::Row;
use crate::session::Session;
use crate::sql;

/// A WHERE clause that is known to be non-empty.
///
/// `update` and `delete` only accept a `Condition`, which rules out accidentally touching every row of a table.
/// The text is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition(String);

impl Condition {
    /// Fails with [`LoaderError::EmptyCondition`] for an empty or blank condition.
    pub fn new<S: AsRef<str>>(condition: S) -> Result<Self> {
        let condition = condition.as_ref().trim();
        if condition.is_empty() {
            return Err(LoaderError::EmptyCondition);
        }
        Ok(Self(condition.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct Crud {
    session: Session,
}

impl Crud {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run a caller-trusted statement without parameters.
    #[instrument(level = "debug", skip(self))]
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        let stmt = Statement::from_string(self.session.backend(), sql.to_string());
        self.execute_statement(stmt).await
    }

    /// `CREATE TABLE IF NOT EXISTS` with `definitions` as the column and constraint block. Definitions are not
    /// checked here; a malformed block comes back as a statement error from the server.
    #[instrument(level = "debug", skip(self, definitions))]
    pub async fn create_table(&mut self, table: &str, definitions: &str) -> Result<()> {
        self.execute(&sql::create_table(table, definitions)).await?;
        debug!("Table '{table}' created");
        Ok(())
    }

    pub async fn drop_table(&mut self, table: &str) -> Result<()> {
        self.execute(&sql::drop_table(table)).await?;
        Ok(())
    }

    /// Insert one row. Each value is bound to its own placeholder; `columns` and `values` must be of the same
    /// length, otherwise nothing is sent to the server.
    #[instrument(level = "debug", skip(self, values))]
    pub async fn insert(&mut self, table: &str, columns: &[&str], values: Vec<Value>) -> Result<u64> {
        if columns.is_empty() || columns.len() != values.len() {
            return Err(LoaderError::ParameterCount {
                table:   table.to_string(),
                columns: columns.len(),
                values:  values.len(),
            });
        }

        let driver = self.session.driver();
        let placeholders = (1..=values.len()).map(|i| driver.placeholder(i)).collect::<Vec<_>>();
        let stmt = Statement::from_sql_and_values(
            self.session.backend(),
            sql::insert(table, columns, &placeholders),
            values,
        );

        self.execute_statement(stmt).await
    }

    /// `SELECT columns FROM table [WHERE condition]`. An empty `columns` means all of them. No matching rows
    /// yields an empty vector.
    #[instrument(level = "debug", skip(self))]
    pub async fn read(&mut self, table: &str, columns: &str, condition: Option<&str>) -> Result<Vec<Row>> {
        let stmt = Statement::from_string(self.session.backend(), sql::select(table, columns, condition));
        self.query_statement(stmt).await
    }

    pub async fn read_all(&mut self, table: &str) -> Result<Vec<Row>> {
        self.read(table, "*", None).await
    }

    /// `UPDATE table SET set WHERE condition`, e.g. `set = "price = 15"`. Returns the number of affected rows.
    #[instrument(level = "debug", skip(self))]
    pub async fn update(&mut self, table: &str, set: &str, condition: &Condition) -> Result<u64> {
        let stmt = Statement::from_string(self.session.backend(), sql::update(table, set, condition));
        self.execute_statement(stmt).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete(&mut self, table: &str, condition: &Condition) -> Result<u64> {
        let stmt = Statement::from_string(self.session.backend(), sql::delete(table, condition));
        self.execute_statement(stmt).await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }

    async fn execute_statement(&mut self, stmt: Statement) -> Result<u64> {
        let conn = self.session.ready().await?.clone();
        let sql = stmt.sql.clone();
        debug!(%sql, "execute");

        match conn.execute(stmt).await {
            Ok(res) => Ok(res.rows_affected()),
            Err(err) => Err(self.session.statement_failed(err, &sql)),
        }
    }

    async fn query_statement(&mut self, stmt: Statement) -> Result<Vec<Row>> {
        let conn = self.session.ready().await?.clone();
        let sql = stmt.sql.clone();
        debug!(%sql, "query");

        match conn.query_all(stmt).await {
            Ok(rows) => Ok(rows.iter().map(Row::decode).collect()),
            Err(err) => Err(self.session.statement_failed(err, &sql)),
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ConnectionConfig;
    use crate::error::StatementErrorKind;

    const CUSTOMERS: &str = "customer_id INT PRIMARY KEY, customer_name VARCHAR(100) NOT NULL, email VARCHAR(100) NOT \
                             NULL";

    async fn crud(dir: &tempfile::TempDir) -> Crud {
        let mut crud = Crud::new(Session::new(&ConnectionConfig::sqlite(dir.path(), "shop")).unwrap());
        crud.create_table("customers", CUSTOMERS).await.unwrap();
        crud
    }

    async fn add(crud: &mut Crud, id: i32, name: &str, email: &str) -> Result<u64> {
        crud.insert(
            "customers",
            &["customer_id", "customer_name", "email"],
            vec![id.into(), name.into(), email.into()],
        )
        .await
    }

    #[test]
    fn blank_condition_is_rejected() {
        assert!(matches!(Condition::new("   "), Err(LoaderError::EmptyCondition)));
        assert!(Condition::new("").is_err());
        assert_eq!(Condition::new(" id = 1 ").unwrap().as_str(), "id = 1");
    }

    #[tokio::test]
    async fn create_table_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();

        crud.create_table("customers", CUSTOMERS).await.unwrap();
        assert_eq!(crud.read_all("customers").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inserted_rows_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();
        add(&mut crud, 2, "Bob", "b@x.com").await.unwrap();

        let rows = crud.read_all("customers").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values(), [json!(1), json!("Alice"), json!("a@x.com")]);
        assert_eq!(rows[1].values(), [json!(2), json!("Bob"), json!("b@x.com")]);
    }

    #[tokio::test]
    async fn mismatched_values_insert_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;

        let err = crud
            .insert("customers", &["customer_id", "customer_name"], vec![1.into()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::ParameterCount {
                columns: 2,
                values: 1,
                ..
            }
        ));
        assert!(crud.read_all("customers").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_key_is_a_statement_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();

        let err = add(&mut crud, 1, "Eve", "e@x.com").await.unwrap_err();
        assert_eq!(err.statement_kind(), Some(StatementErrorKind::UniqueViolation));
    }

    #[tokio::test]
    async fn read_with_condition() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();
        add(&mut crud, 2, "Bob", "b@x.com").await.unwrap();

        let rows = crud
            .read("customers", "customer_name", Some("customer_id = 1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("customer_name"), Some(&json!("Alice")));

        let rows = crud.read("customers", "*", Some("customer_id = 42")).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn every_selected_column_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();
        add(&mut crud, 2, "Bob", "b@x.com").await.unwrap();

        let rows = crud
            .read("customers", "customer_id, customer_name, customer_id", Some("customer_id = 1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns(), ["customer_id", "customer_name", "customer_id"]);
        assert_eq!(rows[0].values(), [json!(1), json!("Alice"), json!(1)]);

        let rows = crud
            .read("customers", "COUNT(*), MAX(customer_id), MIN(customer_id) + 10", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0].values(), [json!(2), json!(2), json!(11)]);
    }

    #[tokio::test]
    async fn prices_and_timestamps_read_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        crud.create_table(
            "products",
            "product_id INT PRIMARY KEY, product_name VARCHAR(100) NOT NULL, price REAL NOT NULL, added DATETIME",
        )
        .await
        .unwrap();

        let added = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        crud.insert(
            "products",
            &["product_id", "product_name", "price", "added"],
            vec![10.into(), "Lamp".into(), 19.99f64.into(), added.into()],
        )
        .await
        .unwrap();
        crud.insert(
            "products",
            &["product_id", "product_name", "price", "added"],
            vec![11.into(), "Desk".into(), 120.5f64.into(), Value::ChronoDateTime(None)],
        )
        .await
        .unwrap();

        let rows = crud.read_all("products").await.unwrap();
        assert_eq!(
            rows[0].values(),
            [json!(10), json!("Lamp"), json!(19.99), json!("2024-01-01 10:00:00")]
        );
        assert_eq!(rows[1].values(), [json!(11), json!("Desk"), json!(120.5), json!(null)]);
    }

    #[tokio::test]
    async fn update_and_delete_touch_matching_rows_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();
        add(&mut crud, 2, "Bob", "b@x.com").await.unwrap();

        let by_bob = Condition::new("customer_id = 2").unwrap();
        let updated = crud
            .update("customers", "email = 'bob@x.com'", &by_bob)
            .await
            .unwrap();
        assert_eq!(updated, 1);
        let rows = crud.read("customers", "email", Some("customer_id = 2")).await.unwrap();
        assert_eq!(rows[0].values(), [json!("bob@x.com")]);

        assert_eq!(crud.delete("customers", &by_bob).await.unwrap(), 1);
        let rows = crud.read("customers", "customer_id", None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values(), [json!(1)]);
    }

    #[tokio::test]
    async fn malformed_definitions_surface_as_statement_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        let err = crud.create_table("broken", "id INT PRIMARY KEY,").await.unwrap_err();
        assert_eq!(err.statement_kind(), Some(StatementErrorKind::Other));
    }

    #[tokio::test]
    async fn reconnects_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut crud = crud(&dir).await;
        add(&mut crud, 1, "Alice", "a@x.com").await.unwrap();

        crud.close().await.unwrap();
        assert!(!crud.session().is_connected());

        // The database is selected again, otherwise the table would not be found.
        let rows = crud.read_all("customers").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(crud.session().database_selected());
    }
}
