//! Schema error types
//!
//! Two kinds of failure live here and they never mix:
//! - `SchemaError`: a schema definition is malformed. Programmer error,
//!   surfaced when the registry is built at startup.
//! - `FieldErrors`: a request input violates a well-formed schema. Plain
//!   data returned from validation, keyed by field path.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for schema construction
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Malformed schema definitions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A pattern failed to compile
    #[error("schema '{schema}': field '{field}' has an invalid pattern: {reason}")]
    InvalidPattern {
        schema: String,
        field: String,
        reason: String,
    },

    /// Lower bound above upper bound
    #[error("schema '{schema}': field '{field}' has min {min} above max {max}")]
    InvalidBounds {
        schema: String,
        field: String,
        min: i64,
        max: i64,
    },

    /// Default value does not satisfy the field's own constraints
    #[error("schema '{schema}': default for field '{field}' is invalid: {reason}")]
    InvalidDefault {
        schema: String,
        field: String,
        reason: String,
    },

    /// A rule was applied to a field of another type
    #[error("schema '{schema}': rule '{rule}' does not apply to field '{field}'")]
    MisappliedRule {
        schema: String,
        field: String,
        rule: &'static str,
    },

    /// Enum field declared without any allowed value
    #[error("schema '{schema}': enum field '{field}' has no allowed values")]
    EmptyEnum { schema: String, field: String },

    /// Refinement references a field the schema does not declare
    #[error("schema '{schema}': refinement references undeclared field '{field}'")]
    UnknownRefinementField { schema: String, field: String },

    /// A schema name was registered twice
    #[error("schema '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Lookup of a schema that was never registered
    #[error("schema '{0}' is not registered")]
    UnknownSchema(String),
}

impl SchemaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::InvalidPattern { .. } => "SCHEMA_INVALID_PATTERN",
            SchemaError::InvalidBounds { .. } => "SCHEMA_INVALID_BOUNDS",
            SchemaError::InvalidDefault { .. } => "SCHEMA_INVALID_DEFAULT",
            SchemaError::MisappliedRule { .. } => "SCHEMA_MISAPPLIED_RULE",
            SchemaError::EmptyEnum { .. } => "SCHEMA_EMPTY_ENUM",
            SchemaError::UnknownRefinementField { .. } => "SCHEMA_UNKNOWN_REFINEMENT_FIELD",
            SchemaError::AlreadyRegistered(_) => "SCHEMA_ALREADY_REGISTERED",
            SchemaError::UnknownSchema(_) => "SCHEMA_UNKNOWN",
        }
    }
}

/// Field-level validation report.
///
/// Maps a field path (`price`, `owner.email`, `tags[2]`) to one message.
/// Ordered so that serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. The first message recorded for a path is kept.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", path, message)?;
            first = false;
        }
        Ok(())
    }
}
