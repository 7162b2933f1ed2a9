//! # Response Envelopes
//!
//! Successful responses wrap their payload in `{"data": ...}`; list
//! responses add `pagination`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::{DataError, DataResult};

/// Single record response
#[derive(Debug, Clone, Serialize)]
pub struct SingleResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: usize) -> Self {
        let per_page = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// One page of records
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { data, pagination }
    }
}

/// Body of a successful delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: String,
}

/// Decodes a stored row into its record type
pub fn record<T: DeserializeOwned>(row: Value) -> DataResult<T> {
    serde_json::from_value(row).map_err(|e| DataError::Internal(format!("malformed row: {e}")))
}

/// Decodes every row of a page
pub fn records<T: DeserializeOwned>(rows: Vec<Value>) -> DataResult<Vec<T>> {
    rows.into_iter().map(record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 12, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 12, 12).total_pages, 1);
        assert_eq!(Pagination::new(2, 12, 13).total_pages, 2);
    }

    #[test]
    fn test_list_serialization() {
        let list = ListResponse::new(vec![json!({"id": "a"})], Pagination::new(1, 20, 41));
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "data": [{"id": "a"}],
                "pagination": {"page": 1, "limit": 20, "total": 41, "totalPages": 3}
            })
        );
    }

    #[test]
    fn test_malformed_row() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[allow(dead_code)]
            price: i64,
        }
        let err = record::<Row>(json!({"price": "cheap"})).unwrap_err();
        assert!(matches!(err, DataError::Internal(_)));
    }
}
