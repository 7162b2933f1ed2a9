//! # HTTP Server Module
//!
//! Axum server exposing the marketplace API. Every handler goes through
//! the admission gate before touching the data store.
//!
//! # Endpoints
//!
//! - `/api/health` - Health check
//! - `/api/accounts[/:id]` - Account listings
//! - `/api/purchase-requests[/:id]` - Purchase requests
//! - `/api/auth/login` - Admin login

pub mod account_routes;
pub mod auth_routes;
pub mod config;
pub mod errors;
pub mod purchase_request_routes;
pub mod response;
pub mod server;
pub mod state;

pub use config::{BootstrapAdmin, HttpServerConfig};
pub use errors::{ServerError, ServerResult};
pub use response::{Deleted, ListResponse, Pagination, SingleResponse};
pub use server::HttpServer;
pub use state::{AppState, Policies};
