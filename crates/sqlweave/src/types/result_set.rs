//! Row sets returned by the driver adapter.

use serde::Serialize;
use serde_json::{Map, Value};

/// A single row: one cell per field, in field order.
pub type Row = Vec<Value>;

/// The rows of one query together with their column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    fields: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set from field names and rows.
    pub fn new(fields: Vec<String>, rows: Vec<Row>) -> Self {
        Self { fields, rows }
    }

    /// Returns the field names in column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a field by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Splits the result set into fields and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.fields, self.rows)
    }

    /// Returns the first row keyed by field name.
    pub fn first_row(&self) -> Option<Map<String, Value>> {
        self.rows.first().map(|row| {
            self.fields
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_row() {
        let rs = ResultSet::new(
            vec!["cc".to_string(), "label".to_string()],
            vec![vec![json!(3), json!("x")], vec![json!(4), json!("y")]],
        );
        let first = rs.first_row().unwrap();
        assert_eq!(first["cc"], json!(3));
        assert_eq!(first["label"], json!("x"));
        assert_eq!(rs.column_index("label"), Some(1));
    }

    #[test]
    fn test_empty_first_row() {
        let rs = ResultSet::new(vec!["cc".to_string()], vec![]);
        assert!(rs.first_row().is_none());
        assert!(rs.is_empty());
    }
}
