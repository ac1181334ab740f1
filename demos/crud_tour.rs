//! Walk through the CRUD engine on a throwaway SQLite database.
//!
//! `cargo run --example crud_tour`
use crud_loader::prelude::*;
use sea_orm::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut crud = Crud::new(Session::new(&ConnectionConfig::sqlite(dir.path(), "tour"))?);

    let schema = Schema::shop();
    schema.recreate(&mut crud).await?;

    for (id, name, email) in [(1, "Alice", "alice@example.com"), (2, "Bob", "bob@example.com")] {
        crud.insert(
            "customers",
            Customer::COLUMNS,
            vec![Value::from(id), Value::from(name), Value::from(email)],
        )
        .await?;
    }

    let renamed = crud
        .update("customers", "customer_name = 'Robert'", &Condition::new("customer_id = 2")?)
        .await?;
    println!("renamed {renamed} customer(s)");

    for row in crud.read("customers", "customer_id, customer_name", None).await? {
        println!("{:?}", row.values());
    }

    match Condition::new("  ") {
        Err(LoaderError::EmptyCondition) => println!("blank conditions are refused"),
        other => println!("unexpected: {other:?}"),
    }

    let removed = crud.delete("customers", &Condition::new("customer_id = 1")?).await?;
    println!("removed {removed} customer(s)");

    crud.close().await?;
    println!("session is {:?}", crud.session().state());

    Ok(())
}
