//! # crud-loader
//!
//! A small data-access layer over a relational database: a connection manager that makes sure the target database
//! exists and is selected, a generic parameterized CRUD engine, a schema definer that orders table creation by
//! foreign keys, and a bulk loader that fills the tables from header-first CSV files.
//!
//! SQLite, PostgreSQL and MySQL are supported through [sea-orm](https://crates.io/crates/sea-orm), each behind
//! its own cargo feature (`sqlite`, `pg`, `mysql`; only `sqlite` is on by default).
//!
//! # The Basics
//!
//! ```no_run
//! use crud_loader::prelude::*;
//!
//! # async fn example() -> crud_loader::error::Result<()> {
//! let config = ConnectionConfig::sqlite("/var/lib/shop", "shop");
//! let mut crud = Crud::new(Session::new(&config)?);
//!
//! let schema = Schema::shop();
//! schema.recreate(&mut crud).await?;
//!
//! let report = BulkLoader::new("data").load_all(&mut crud, &schema).await?;
//! println!("{} rows loaded", report.total());
//!
//! let expensive = crud.read("products", "product_name, price", Some("price > 100")).await?;
//! crud.delete("orders", &Condition::new("customer_id = 42")?).await?;
//! crud.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! A session connects on first use and, after a lost connection or an explicit [`close`](session::Session::close),
//! reconnects and selects its database again on the next call.
//!
//! # Trust Boundary
//!
//! Inserted values are always bound as statement parameters. Table names, column lists, `SET` clauses and `WHERE`
//! conditions are placed into the statement text as given and must come from trusted code.
//!
//! # Atomicity
//!
//! Every statement commits on its own. A load that fails halfway keeps the rows inserted before the failure.

pub mod app;
pub mod config;
pub mod crud;
pub mod driver;
pub mod entity;
pub mod error;
pub mod loader;
pub mod progress;
pub mod row;
pub mod schema;
pub mod session;
pub mod sql;

#[doc(inline)]
pub use crud::Crud;
#[doc(inline)]
pub use error::LoaderError;
#[doc(inline)]
pub use session::Session;

pub mod prelude {
    pub use crate::config::Backend;
    pub use crate::config::ConnectionConfig;
    pub use crate::crud::Condition;
    pub use crate::crud::Crud;
    pub use crate::entity::Customer;
    pub use crate::entity::EntityKind;
    pub use crate::entity::Order;
    pub use crate::entity::Product;
    pub use crate::entity::Record;
    pub use crate::error::LoaderError;
    pub use crate::error::StatementErrorKind;
    pub use crate::loader::BulkLoader;
    pub use crate::loader::LoadReport;
    pub use crate::row::Row;
    pub use crate::schema::Schema;
    pub use crate::session::Session;
    pub use crate::session::SessionState;
}
