//! Flat rows to nested objects.
//!
//! Column names are turned into attribute paths once per result set: each
//! `.`-separated segment is camelCased (`first_name` becomes `firstName`), and
//! a path with several segments (`address.city`) is assigned by walking and
//! creating nested objects. Null cells are skipped, so the attribute is absent
//! from the object rather than present as `null`.
//!
//! # Underscore rule
//!
//! Every `_` followed by a word character (`[A-Za-z0-9_]`) is dropped and the
//! following character upper-cased. Any other `_` is kept as-is:
//!
//! | column      | attribute  |
//! |-------------|------------|
//! | `user_id`   | `userId`   |
//! | `_id`       | `Id`       |
//! | `a__b`      | `a_b`      |
//! | `trailing_` | `trailing_`|

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::MaterializeError;
use crate::types::{ResultSet, Row};

static UNDERSCORE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\w)").expect("underscore pattern is valid")
});

/// Converts a snake_case column name to a camelCase attribute path.
pub fn camel_case(name: &str) -> String {
    UNDERSCORE_WORD
        .replace_all(name, |caps: &Captures<'_>| caps[1].to_uppercase())
        .into_owned()
}

/// Column positions mapped to attribute paths.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    targets: Vec<(usize, Vec<String>)>,
}

impl FieldMapping {
    /// Derives the mapping from column names.
    pub fn from_fields(fields: &[String]) -> Self {
        Self::with_overrides(fields, &HashMap::new())
    }

    /// Derives the mapping, using `overrides` (column name to dotted path)
    /// where present.
    pub fn with_overrides(fields: &[String], overrides: &HashMap<String, String>) -> Self {
        let targets = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let path = match overrides.get(field) {
                    Some(path) => path.clone(),
                    None => camel_case(field),
                };
                (index, path.split('.').map(str::to_string).collect())
            })
            .collect();
        Self { targets }
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if no columns are mapped.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns the dotted path for a column position.
    pub fn path(&self, index: usize) -> Option<String> {
        self.targets
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, segments)| segments.join("."))
    }

    /// Builds one object from a row.
    pub fn to_object(&self, row: &Row) -> Result<Map<String, Value>, MaterializeError> {
        let mut object = Map::new();
        for (index, segments) in &self.targets {
            match row.get(*index) {
                None | Some(Value::Null) => continue,
                Some(value) => assign(&mut object, segments, value.clone())?,
            }
        }
        Ok(object)
    }
}

fn assign(
    object: &mut Map<String, Value>,
    segments: &[String],
    value: Value,
) -> Result<(), MaterializeError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = object;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(MaterializeError::PathConflict {
                    path: segments.join("."),
                    segment: segment.clone(),
                });
            }
        };
    }
    if current.get(last).is_some_and(Value::is_object) {
        return Err(MaterializeError::PathConflict {
            path: segments.join("."),
            segment: last.clone(),
        });
    }
    current.insert(last.clone(), value);
    Ok(())
}

/// Converts result sets into typed objects.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    overrides: HashMap<String, String>,
}

impl Materializer {
    /// Creates a materializer using the camelCase mapping only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `column` to `path` instead of its camelCase name.
    pub fn with_override(mut self, column: impl Into<String>, path: impl Into<String>) -> Self {
        self.overrides.insert(column.into(), path.into());
        self
    }

    /// Derives the mapping for a result set shape.
    pub fn mapping(&self, fields: &[String]) -> FieldMapping {
        FieldMapping::with_overrides(fields, &self.overrides)
    }

    /// Builds one object per row.
    pub fn materialize<T: DeserializeOwned>(
        &self,
        result: ResultSet,
    ) -> Result<Vec<T>, MaterializeError> {
        self.materialize_with(result, |_: &mut T| {})
    }

    /// Builds one object per row, then runs `hook` on each in row order.
    pub fn materialize_with<T, H>(
        &self,
        result: ResultSet,
        mut hook: H,
    ) -> Result<Vec<T>, MaterializeError>
    where
        T: DeserializeOwned,
        H: FnMut(&mut T),
    {
        let (fields, rows) = result.into_parts();
        let mapping = self.mapping(&fields);

        let mut objects = Vec::with_capacity(rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(MaterializeError::RowWidth {
                    row: row_index,
                    expected: fields.len(),
                    actual: row.len(),
                });
            }
            let object = mapping.to_object(row)?;
            let item: T = serde_json::from_value(Value::Object(object)).map_err(|e| {
                MaterializeError::Deserialize {
                    row: row_index,
                    message: e.to_string(),
                }
            })?;
            objects.push(item);
        }

        for item in objects.iter_mut() {
            hook(item);
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("id"), "id");
        assert_eq!(camel_case("created_at_utc"), "createdAtUtc");
        assert_eq!(camel_case("addr_2"), "addr2");
        assert_eq!(camel_case("customer.home_city"), "customer.homeCity");
    }

    #[test]
    fn test_camel_case_irregular_underscores() {
        assert_eq!(camel_case("_id"), "Id");
        assert_eq!(camel_case("a__b"), "a_b");
        assert_eq!(camel_case("trailing_"), "trailing_");
    }

    #[test]
    fn test_nested_assignment_with_override() {
        let m = Materializer::new().with_override("addr_city", "address.city");
        let rs = ResultSet::new(
            fields(&["first_name", "addr_city"]),
            vec![vec![json!("A"), json!("X")]],
        );
        let out: Vec<Value> = m.materialize(rs).unwrap();
        assert_eq!(out, vec![json!({"firstName": "A", "address": {"city": "X"}})]);
    }

    #[test]
    fn test_null_cells_are_absent() {
        let m = Materializer::new().with_override("addr_city", "address.city");
        let rs = ResultSet::new(
            fields(&["first_name", "addr_city"]),
            vec![vec![json!("A"), Value::Null]],
        );
        let out: Vec<Value> = m.materialize(rs).unwrap();
        assert_eq!(out, vec![json!({"firstName": "A"})]);
        assert!(out[0].get("address").is_none());
    }

    #[test]
    fn test_intermediate_created_once() {
        let rs = ResultSet::new(
            fields(&["customer.address.city", "customer.address.zip", "customer.name"]),
            vec![vec![json!("Oslo"), json!("0150"), json!("Kari")]],
        );
        let out: Vec<Value> = Materializer::new().materialize(rs).unwrap();
        assert_eq!(
            out[0],
            json!({"customer": {"name": "Kari", "address": {"city": "Oslo", "zip": "0150"}}})
        );
    }

    #[test]
    fn test_rows_are_independent() {
        let rs = ResultSet::new(
            fields(&["a.b"]),
            vec![vec![json!(1)], vec![json!(2)]],
        );
        let mut out: Vec<Value> = Materializer::new().materialize(rs).unwrap();
        out[0]["a"]["b"] = json!(99);
        assert_eq!(out[1]["a"]["b"], json!(2));
    }

    #[test]
    fn test_path_conflict() {
        let rs = ResultSet::new(
            fields(&["address", "address.city"]),
            vec![vec![json!("flat"), json!("X")]],
        );
        let err = Materializer::new().materialize::<Value>(rs).unwrap_err();
        assert!(matches!(err, MaterializeError::PathConflict { .. }));
    }

    #[test]
    fn test_path_conflict_regardless_of_column_order() {
        let rs = ResultSet::new(
            fields(&["address.city", "address"]),
            vec![vec![json!("X"), json!("flat")]],
        );
        let err = Materializer::new().materialize::<Value>(rs).unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::PathConflict { ref segment, .. } if segment == "address"
        ));
    }

    #[test]
    fn test_hook_runs_in_row_order() {
        let rs = ResultSet::new(
            fields(&["id"]),
            vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]],
        );
        let mut seen = Vec::new();
        let out: Vec<Value> = Materializer::new()
            .materialize_with(rs, |item: &mut Value| {
                seen.push(item["id"].clone());
                item["visited"] = json!(true);
            })
            .unwrap();
        assert_eq!(seen, vec![json!(1), json!(2), json!(3)]);
        assert!(out.iter().all(|o| o["visited"] == json!(true)));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct User {
        user_id: i64,
        display_name: Option<String>,
    }

    #[test]
    fn test_typed_target() {
        let rs = ResultSet::new(
            fields(&["user_id", "display_name"]),
            vec![vec![json!(7), Value::Null]],
        );
        let users: Vec<User> = Materializer::new().materialize(rs).unwrap();
        assert_eq!(
            users,
            vec![User {
                user_id: 7,
                display_name: None
            }]
        );
    }

    #[test]
    fn test_row_width_mismatch() {
        let rs = ResultSet::new(fields(&["a", "b"]), vec![vec![json!(1)]]);
        let err = Materializer::new().materialize::<Value>(rs).unwrap_err();
        assert!(matches!(err, MaterializeError::RowWidth { .. }));
    }
}
