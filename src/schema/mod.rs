//! Schema registry and validator
//!
//! Every inbound payload and query string is checked against a named schema
//! before it reaches the data layer.
//!
//! # Design Principles
//!
//! - Schemas are immutable values; derivations return new schemas
//! - Malformed schemas fail at registry construction, not per request
//! - Validation reports every failing field in one pass
//! - Validation is deterministic

mod errors;
mod registry;
mod types;
mod validator;

pub use errors::{FieldErrors, SchemaError, SchemaResult};
pub use registry::{
    names, SchemaRegistry, ACCOUNT_STATUSES, CATEGORIES, MAX_PAGE_SIZE, MAX_PRICE,
    MIN_DESIRED_PRICE, PURCHASE_REQUEST_STATUSES,
};
pub use types::{
    BoolRules, CharClass, Check, FieldDef, FieldType, IntRules, Refinement, RefinementRule,
    Schema, StringFormat, StringRules, UnknownFields,
};
pub use validator::{ValidationResult, ROOT_PATH};
