//! # Auth Module
//!
//! Admin authentication: Argon2id password hashes, HS256 bearer tokens and
//! the `CallerVerifier` used by the admission gate.

pub mod admin;
pub mod crypto;
pub mod errors;
pub mod jwt;
pub mod service;

pub use admin::{Admin, AdminRepository, InMemoryAdminRepository};
pub use errors::{AuthError, AuthResult};
pub use jwt::{AdminClaims, BearerGrant, IssuedToken, TokenSettings, TokenSigner};
pub use service::{
    bearer_token, AdminProfile, AdminSession, AuthService, CallerVerifier, CreateAdminRequest,
    LoginRequest, LoginResponse,
};
