//! Records of the shop schema and their mapping to insert statements.
use chrono::NaiveDateTime;
use sea_orm::Value;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A row that can be decoded from a delimited source and inserted into its table.
///
/// Fields are decoded by position and must follow `COLUMNS`.
pub trait Record: for<'de> Deserialize<'de> + Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Values in `COLUMNS` order.
    fn into_values(self) -> Vec<Value>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id:   i32,
    pub customer_name: String,
    pub email:         String,
}

impl Record for Customer {
    const COLUMNS: &'static [&'static str] = &["customer_id", "customer_name", "email"];
    const TABLE: &'static str = "customers";

    fn into_values(self) -> Vec<Value> {
        vec![self.customer_id.into(), self.customer_name.into(), self.email.into()]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id:   i32,
    pub product_name: String,
    pub price:        f64,
}

impl Record for Product {
    const COLUMNS: &'static [&'static str] = &["product_id", "product_name", "price"];
    const TABLE: &'static str = "products";

    fn into_values(self) -> Vec<Value> {
        vec![self.product_id.into(), self.product_name.into(), self.price.into()]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id:          i32,
    #[serde(deserialize_with = "date_time")]
    pub date_time:   NaiveDateTime,
    pub customer_id: i32,
    pub product_id:  i32,
}

impl Record for Order {
    const COLUMNS: &'static [&'static str] = &["id", "date_time", "customer_id", "product_id"];
    const TABLE: &'static str = "orders";

    fn into_values(self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.date_time.into(),
            self.customer_id.into(),
            self.product_id.into(),
        ]
    }
}

fn date_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date_time '{raw}', expected YYYY-MM-DD HH:MM:SS")))
}

/// The tables the bulk loader knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Customers,
    Products,
    Orders,
}

impl EntityKind {
    pub fn for_table(table: &str) -> Option<Self> {
        [EntityKind::Customers, EntityKind::Products, EntityKind::Orders]
            .into_iter()
            .find(|kind| kind.table() == table)
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Customers => Customer::TABLE,
            EntityKind::Products => Product::TABLE,
            EntityKind::Orders => Order::TABLE,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Customers => Customer::COLUMNS,
            EntityKind::Products => Product::COLUMNS,
            EntityKind::Orders => Order::COLUMNS,
        }
    }

    /// Default source file name.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.table())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::schema::Schema;

    #[test]
    fn columns_match_schema() {
        let schema = Schema::shop();
        for kind in [EntityKind::Customers, EntityKind::Products, EntityKind::Orders] {
            let table = schema.table(kind.table()).unwrap();
            assert_eq!(table.column_names(), kind.columns());
            assert_eq!(EntityKind::for_table(kind.table()), Some(kind));
        }
        assert_eq!(EntityKind::for_table("sessions"), None);
    }

    #[test]
    fn order_accepts_both_separators() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        for line in ["100,2024-01-01 10:00:00,1,2", "100,2024-01-01T10:00:00,1,2"] {
            let record = csv::StringRecord::from(line.split(',').collect::<Vec<_>>());
            let order: Order = record.deserialize(None).unwrap();
            assert_eq!(order.date_time, expected);
            assert_eq!(order.product_id, 2);
        }
    }

    #[test]
    fn values_follow_columns() {
        let product = Product {
            product_id:   7,
            product_name: "Lamp".into(),
            price:        19.99,
        };
        let values = product.into_values();
        assert_eq!(values.len(), Product::COLUMNS.len());
        assert_eq!(values[0], Value::Int(Some(7)));
        assert_eq!(values[2], Value::Double(Some(19.99)));
    }
}
