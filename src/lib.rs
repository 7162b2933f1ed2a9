//! marketgate - request admission for an account marketplace backend
//!
//! Every inbound request passes one gate before it reaches the data layer:
//! admin verification, a fixed-window rate limit, then schema validation
//! of the JSON body or query string.

pub mod admission;
pub mod auth;
pub mod cli;
pub mod http_server;
pub mod market;
pub mod observability;
pub mod ratelimit;
pub mod schema;
pub mod store;
