//! Statement text rendering.
//!
//! Table names, column lists, column definitions, SET clauses and conditions are caller-controlled and end up in
//! the statement text as given: they cannot be bound as parameters, and nothing here sanitizes them. Only values
//! passed to [`insert`] travel as bound parameters. Never feed untrusted input into any other argument.

use crate::crud::Condition;

pub fn create_table(table: &str, definitions: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (\n{}\n)", definitions.trim())
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

/// `placeholders` must hold one marker per column.
pub fn insert(table: &str, columns: &[&str], placeholders: &[String]) -> String {
    debug_assert_eq!(columns.len(), placeholders.len());
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub fn select(table: &str, columns: &str, condition: Option<&str>) -> String {
    let columns = match columns.trim() {
        "" => "*",
        c => c,
    };
    let mut sql = format!("SELECT {columns} FROM {table}");
    if let Some(condition) = condition.map(str::trim).filter(|c| !c.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

pub fn update(table: &str, set: &str, condition: &Condition) -> String {
    format!("UPDATE {table} SET {} WHERE {condition}", set.trim())
}

pub fn delete(table: &str, condition: &Condition) -> String {
    format!("DELETE FROM {table} WHERE {condition}")
}
