//! # Data Store
//!
//! Persistence interface consumed by the endpoint handlers, a query model
//! with filters, sort, range pagination and exact counts, and an in-memory
//! implementation.

mod backend;
mod errors;
mod memory;
mod query;

pub use backend::DataStore;
pub use errors::{
    DataError, DataResult, PGRST_NO_ROWS, PG_CHECK_VIOLATION, PG_FOREIGN_KEY_VIOLATION,
    PG_UNIQUE_VIOLATION,
};
pub use memory::{MemoryStore, TableSpec};
pub use query::{Filter, FilterOp, Page, SelectQuery, Sort, SortOrder};
