//! # Request Admission
//!
//! The single path every HTTP endpoint takes before touching data:
//! caller verification, rate limiting, then input validation, then the
//! hand-off to the handler.

mod errors;
mod gate;

pub use errors::{
    AdmissionError, AdmissionResult, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use gate::{AdmissionGate, Admitted, EndpointPolicy, InputSource, RawInput, RequestMeta};
