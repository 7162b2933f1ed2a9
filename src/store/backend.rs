//! # Data Store Trait

use serde_json::Value;

use super::errors::DataResult;
use super::query::{Page, SelectQuery};

/// Table-oriented persistence used by the endpoint handlers
pub trait DataStore: Send + Sync + std::fmt::Debug {
    /// Rows of `table` matching `query`
    fn select(&self, table: &str, query: &SelectQuery) -> DataResult<Page>;

    /// Single row by id; `NotFound` if absent
    fn find(&self, table: &str, id: &str) -> DataResult<Value>;

    /// Insert a row and return it as stored, with `id` and timestamps set
    fn insert(&self, table: &str, row: Value) -> DataResult<Value>;

    /// Merge `patch` into the row and return the result; `NotFound` if absent
    fn update(&self, table: &str, id: &str, patch: Value) -> DataResult<Value>;

    /// Delete a row. Returns whether a row was removed.
    fn delete(&self, table: &str, id: &str) -> DataResult<bool>;
}
