//! Select queries
//!
//! Filters compare without type coercion. Rows missing the column or
//! holding null never match a filter.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// One column predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, row: &Value) -> bool {
        let actual = match row.get(&self.column) {
            Some(Value::Null) | None => return false,
            Some(v) => v,
        };

        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Gte => {
                compare_json_values(actual, &self.value).is_some_and(|o| o != Ordering::Less)
            }
            FilterOp::Lte => {
                compare_json_values(actual, &self.value).is_some_and(|o| o != Ordering::Greater)
            }
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

/// Filtered, sorted, ranged select
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    /// Inclusive row range `(from, to)` applied after sorting
    pub range: Option<(usize, usize)>,
    /// Report the number of matching rows before the range
    pub count: bool,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn filter(mut self, column: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            column: column.to_string(),
            order,
        });
        self
    }

    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to));
        self
    }

    /// Range for a 1-based page of `limit` rows. Offsets saturate, so a
    /// page far past the end is simply empty.
    pub fn page(self, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        let from = (page.max(1) - 1).saturating_mul(limit);
        let to = from.saturating_add(limit - 1);
        let as_index = |n: u64| usize::try_from(n).unwrap_or(usize::MAX);
        self.range(as_index(from), as_index(to))
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Applies filters, sort, count and range to `rows`
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Value>) -> Page {
        let mut matched: Vec<Value> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();

        if let Some(sort) = &self.sort {
            // Stable: ties keep storage order
            matched.sort_by(|a, b| {
                let cmp = compare_sort_keys(a.get(&sort.column), b.get(&sort.column));
                match sort.order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                }
            });
        }

        let total = self.count.then_some(matched.len());

        let rows = match self.range {
            Some((from, to)) if to >= from => {
                matched.into_iter().skip(from).take(to - from + 1).collect()
            }
            Some(_) => Vec::new(),
            None => matched,
        };

        Page { rows, total }
    }
}

/// Rows returned by a select
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Value>,
    /// Exact match count when requested
    pub total: Option<usize>,
}

/// Orders two scalars of the same JSON type
fn compare_json_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Sort key comparison; nulls and missing values sort last ascending
fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (Some(a), Some(b)) => compare_json_values(a, b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
