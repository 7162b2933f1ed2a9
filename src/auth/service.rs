//! # Auth Service
//!
//! Login and bearer token verification.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::admin::{Admin, AdminRepository};
use super::errors::{AuthError, AuthResult};
use super::jwt::{BearerGrant, TokenSettings, TokenSigner};

/// Authenticated admin derived from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminSession {
    pub admin_id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Decides whether a request comes from a signed-in admin.
///
/// Every failure is reported as an `AuthError`; callers must not tell the
/// client which check failed.
pub trait CallerVerifier: Send + Sync {
    fn verify_caller(&self, headers: &HeaderMap) -> AuthResult<AdminSession>;
}

/// Login request, produced by the `auth.login` schema
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Admin entry produced by the `admin.create` schema
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub admin: AdminProfile,
    #[serde(flatten)]
    pub tokens: BearerGrant,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<Admin> for AdminProfile {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            name: admin.name,
            last_login_at: admin.last_login_at,
        }
    }
}

/// Auth service combining the admin store and the token manager
pub struct AuthService {
    admins: Arc<dyn AdminRepository>,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(admins: Arc<dyn AdminRepository>, settings: TokenSettings) -> Self {
        Self {
            admins,
            signer: TokenSigner::new(settings),
        }
    }

    /// Authenticate an admin and issue a bearer token
    pub fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse> {
        let mut admin = self
            .admins
            .find_by_email(&request.email)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !admin.verify_password(&request.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        admin.record_login(now);
        self.admins.update(&admin)?;

        let issued = self.signer.sign(&admin)?;
        Ok(LoginResponse {
            admin: AdminProfile::from(admin),
            tokens: BearerGrant::at(issued, now),
        })
    }

    /// Validate a raw bearer token
    pub fn verify_token(&self, token: &str) -> AuthResult<AdminSession> {
        let claims = self.signer.verify(token)?;
        let admin_id = claims.admin_id()?;
        let expires_at = claims.expires_at()?;

        Ok(AdminSession {
            admin_id,
            email: claims.email,
            name: claims.name,
            expires_at,
        })
    }
}

impl CallerVerifier for AuthService {
    fn verify_caller(&self, headers: &HeaderMap) -> AuthResult<AdminSession> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        self.verify_token(token)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::admin::InMemoryAdminRepository;
    use axum::http::HeaderValue;

    fn service_with(admins: InMemoryAdminRepository) -> AuthService {
        AuthService::new(
            Arc::new(admins),
            TokenSettings::for_secret("service-test-secret"),
        )
    }

    fn create_test_service() -> AuthService {
        service_with(InMemoryAdminRepository::new())
    }

    /// Service holding one admin, `admin@example.com` / `Password123`
    fn seeded_service() -> (AuthService, Admin) {
        let admins = InMemoryAdminRepository::new();
        let admin = Admin::new(
            "admin@example.com".to_string(),
            "Password123",
            Some("Ops".to_string()),
        )
        .unwrap();
        admins.create(&admin).unwrap();
        (service_with(admins), admin)
    }

    fn login(service: &AuthService, password: &str) -> AuthResult<LoginResponse> {
        service.login(&LoginRequest {
            email: "admin@example.com".to_string(),
            password: password.to_string(),
        })
    }

    fn auth_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let (service, admin) = seeded_service();

        let response = login(&service, "Password123").unwrap();
        assert_eq!(response.admin.id, admin.id);
        assert!(response.admin.last_login_at.is_some());
        assert_eq!(response.tokens.token_type, "bearer");

        let headers = auth_headers(&format!("Bearer {}", response.tokens.access_token));
        let session = service.verify_caller(&headers).unwrap();
        assert_eq!(session.admin_id, admin.id);
        assert_eq!(session.email, "admin@example.com");
        assert_eq!(session.expires_at.timestamp(), response.tokens.expires_at);
    }

    #[test]
    fn test_login_wrong_password() {
        let (service, _) = seeded_service();
        assert_eq!(
            login(&service, "Password124").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_login_unknown_email() {
        let service = create_test_service();
        assert_eq!(
            login(&service, "Password123").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let service = create_test_service();
        assert_eq!(
            service.verify_caller(&HeaderMap::new()).unwrap_err(),
            AuthError::MissingToken
        );
        assert_eq!(
            service.verify_caller(&auth_headers("Basic abc")).unwrap_err(),
            AuthError::MissingToken
        );
        assert_eq!(
            service.verify_caller(&auth_headers("Bearer ")).unwrap_err(),
            AuthError::MissingToken
        );
        assert!(service.verify_caller(&auth_headers("Bearer nope")).is_err());
    }

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        assert_eq!(bearer_token(&auth_headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&auth_headers("BEARER abc")), Some("abc"));
    }
}
