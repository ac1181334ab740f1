use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use sea_orm::prelude::Decimal;
use sea_orm::QueryResult;
use sea_orm::TryGetable;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One result row: column values in the order the server returned them.
///
/// Every selected column is present, duplicates and unnamed expressions included. Integers, floats and decimals
/// all come back as JSON numbers, date-times as `YYYY-MM-DD HH:MM:SS` strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<String>,
    values:  Vec<JsonValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<JsonValue>) -> Self {
        Self { columns, values }
    }

    /// Decode a result row column by column.
    pub fn decode(res: &QueryResult) -> Self {
        let columns = res.column_names();
        let values = (0..columns.len()).map(|idx| decode_column(res, idx)).collect();
        Self::new(columns, values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[JsonValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<JsonValue> {
        self.values
    }

    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// `None` when the column can't be read as `T`; `Some(None)` for SQL NULL.
fn attempt<T: TryGetable>(res: &QueryResult, idx: usize) -> Option<Option<T>> {
    res.try_get_by_index::<Option<T>>(idx).ok()
}

fn decode_column(res: &QueryResult, idx: usize) -> JsonValue {
    if let Some(v) = attempt::<i64>(res, idx) {
        return v.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<i32>(res, idx) {
        return v.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<i16>(res, idx) {
        return v.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<f64>(res, idx) {
        return v.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<f32>(res, idx) {
        return v.map_or(JsonValue::Null, |f| JsonValue::from(f64::from(f)));
    }
    // Server-side DECIMAL columns become numbers, same as SQLite's REAL.
    if let Some(v) = attempt::<Decimal>(res, idx) {
        return v
            .and_then(|d| d.to_string().parse::<f64>().ok())
            .map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<bool>(res, idx) {
        return v.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<NaiveDateTime>(res, idx) {
        return v.map_or(JsonValue::Null, |dt| JsonValue::from(dt.format(DATE_TIME_FORMAT).to_string()));
    }
    if let Some(v) = attempt::<DateTime<Utc>>(res, idx) {
        return v.map_or(JsonValue::Null, |dt| JsonValue::from(dt.to_rfc3339()));
    }
    if let Some(v) = attempt::<String>(res, idx) {
        return v.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Some(v) = attempt::<Vec<u8>>(res, idx) {
        return v.map_or(JsonValue::Null, |b| JsonValue::from(String::from_utf8_lossy(&b).into_owned()));
    }

    debug!("Column #{idx} has no supported type, reported as NULL");
    JsonValue::Null
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookup_by_name() {
        let row = Row::new(
            vec!["customer_id".into(), "customer_name".into(), "customer_id".into()],
            vec![json!(2), json!("Bob"), json!(3)],
        );
        assert_eq!(row.columns(), ["customer_id", "customer_name", "customer_id"]);
        assert_eq!(row.get("customer_id"), Some(&json!(2)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 3);
        assert!(!row.is_empty());
        assert!(Row::new(vec![], vec![]).is_empty());
    }
}
