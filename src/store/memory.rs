//! In-memory data store
//!
//! Tables must be declared up front. Rows keep insertion order, which is
//! also the tie-break order for sorts.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::backend::DataStore;
use super::errors::{DataError, DataResult};
use super::query::{Page, SelectQuery};

/// Declared shape of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    /// Columns whose non-null values must be distinct
    pub unique: Vec<String>,
    /// Maintain an `updated_at` column
    pub updated_at: bool,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: Vec::new(),
            updated_at: false,
        }
    }

    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique.push(column.into());
        self
    }

    pub fn with_updated_at(mut self) -> Self {
        self.updated_at = true;
        self
    }
}

#[derive(Debug)]
struct Table {
    spec: TableSpec,
    rows: Vec<Value>,
}

impl Table {
    fn position(&self, id: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
    }

    /// First unique column `candidate` collides on, ignoring row `skip`
    fn conflict(&self, candidate: &Map<String, Value>, skip: Option<usize>) -> Option<&str> {
        self.spec.unique.iter().map(String::as_str).find(|column| {
            let Some(value) = candidate.get(*column).filter(|v| !v.is_null()) else {
                return false;
            };
            self.rows
                .iter()
                .enumerate()
                .any(|(i, row)| Some(i) != skip && row.get(*column) == Some(value))
        })
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

fn poisoned<T>(_: T) -> DataError {
    DataError::Internal("Lock poisoned".to_string())
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn into_object(value: Value) -> DataResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DataError::Internal(format!(
            "expected an object row, got {}",
            other
        ))),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given tables declared
    pub fn with_tables(specs: impl IntoIterator<Item = TableSpec>) -> Self {
        let tables = specs
            .into_iter()
            .map(|spec| {
                (
                    spec.name.clone(),
                    Table {
                        spec,
                        rows: Vec::new(),
                    },
                )
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    fn with_table<R>(&self, name: &str, f: impl FnOnce(&Table) -> DataResult<R>) -> DataResult<R> {
        let tables = self.tables.read().map_err(poisoned)?;
        let table = tables
            .get(name)
            .ok_or_else(|| DataError::UnknownTable(name.to_string()))?;
        f(table)
    }

    fn with_table_mut<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Table) -> DataResult<R>,
    ) -> DataResult<R> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| DataError::UnknownTable(name.to_string()))?;
        f(table)
    }
}

impl DataStore for MemoryStore {
    fn select(&self, table: &str, query: &SelectQuery) -> DataResult<Page> {
        self.with_table(table, |t| Ok(query.apply(&t.rows)))
    }

    fn find(&self, table: &str, id: &str) -> DataResult<Value> {
        self.with_table(table, |t| {
            t.position(id)
                .map(|i| t.rows[i].clone())
                .ok_or(DataError::NotFound)
        })
    }

    fn insert(&self, table: &str, row: Value) -> DataResult<Value> {
        let mut row = into_object(row)?;
        self.with_table_mut(table, |t| {
            let now = timestamp();
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            row.insert("created_at".to_string(), now.clone());
            if t.spec.updated_at {
                row.insert("updated_at".to_string(), now);
            }

            if let Some(column) = t.conflict(&row, None) {
                return Err(DataError::Duplicate {
                    table: t.spec.name.clone(),
                    column: column.to_string(),
                });
            }

            let row = Value::Object(row);
            t.rows.push(row.clone());
            Ok(row)
        })
    }

    fn update(&self, table: &str, id: &str, patch: Value) -> DataResult<Value> {
        let patch = into_object(patch)?;
        self.with_table_mut(table, |t| {
            let index = t.position(id).ok_or(DataError::NotFound)?;

            let mut merged = into_object(t.rows[index].clone())?;
            for (column, value) in patch {
                // Identity and creation time are immutable
                if column != "id" && column != "created_at" {
                    merged.insert(column, value);
                }
            }
            if t.spec.updated_at {
                merged.insert("updated_at".to_string(), timestamp());
            }

            if let Some(column) = t.conflict(&merged, Some(index)) {
                return Err(DataError::Duplicate {
                    table: t.spec.name.clone(),
                    column: column.to_string(),
                });
            }

            let merged = Value::Object(merged);
            t.rows[index] = merged.clone();
            Ok(merged)
        })
    }

    fn delete(&self, table: &str, id: &str) -> DataResult<bool> {
        self.with_table_mut(table, |t| match t.position(id) {
            Some(index) => {
                t.rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortOrder;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::with_tables([TableSpec::new("accounts")
            .unique("username")
            .with_updated_at()])
    }

    #[test]
    fn test_insert_assigns_id_and_timestamps() {
        let store = store();
        let row = store
            .insert("accounts", json!({"username": "alice", "price": 100}))
            .unwrap();

        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(row["created_at"], row["updated_at"]);
        assert_eq!(store.find("accounts", row["id"].as_str().unwrap()).unwrap(), row);
    }

    #[test]
    fn test_unique_column_enforced() {
        let store = store();
        store.insert("accounts", json!({"username": "alice"})).unwrap();
        let err = store.insert("accounts", json!({"username": "alice"})).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_ERROR");

        let bob = store.insert("accounts", json!({"username": "bob"})).unwrap();
        let err = store
            .update("accounts", bob["id"].as_str().unwrap(), json!({"username": "alice"}))
            .unwrap_err();
        assert!(matches!(err, DataError::Duplicate { ref column, .. } if column == "username"));

        // Rewriting a row's own value is fine
        store
            .update("accounts", bob["id"].as_str().unwrap(), json!({"username": "bob"}))
            .unwrap();
    }

    #[test]
    fn test_update_merges_and_protects_identity() {
        let store = store();
        let row = store
            .insert("accounts", json!({"username": "alice", "price": 100}))
            .unwrap();
        let id = row["id"].as_str().unwrap();

        let updated = store
            .update("accounts", id, json!({"price": 250, "id": "hijack"}))
            .unwrap();
        assert_eq!(updated["id"], id);
        assert_eq!(updated["price"], 250);
        assert_eq!(updated["username"], "alice");
        assert_eq!(updated["created_at"], row["created_at"]);
    }

    #[test]
    fn test_missing_rows() {
        let store = store();
        assert_eq!(store.find("accounts", "nope"), Err(DataError::NotFound));
        assert_eq!(
            store.update("accounts", "nope", json!({})),
            Err(DataError::NotFound)
        );
        assert_eq!(store.delete("accounts", "nope"), Ok(false));
    }

    #[test]
    fn test_unknown_table() {
        assert!(matches!(
            store().select("ghosts", &SelectQuery::new()),
            Err(DataError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_select_and_delete() {
        let store = store();
        for (name, price) in [("a", 300), ("b", 100), ("c", 200)] {
            store
                .insert("accounts", json!({"username": name, "price": price}))
                .unwrap();
        }

        let page = store
            .select(
                "accounts",
                &SelectQuery::new()
                    .order("price", SortOrder::Asc)
                    .range(0, 1)
                    .with_count(),
            )
            .unwrap();
        assert_eq!(page.total, Some(3));
        assert_eq!(page.rows[0]["username"], "b");
        assert_eq!(page.rows[1]["username"], "c");

        let id = page.rows[0]["id"].as_str().unwrap().to_string();
        assert_eq!(store.delete("accounts", &id), Ok(true));
        assert_eq!(store.find("accounts", &id), Err(DataError::NotFound));
    }
}
