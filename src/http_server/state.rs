//! Shared handler state
//!
//! One `AppState` per server: the admission gate, the data store, the auth
//! service and the policy of every endpoint.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;

use super::config::HttpServerConfig;
use super::errors::ServerResult;
use crate::admission::{AdmissionGate, EndpointPolicy};
use crate::auth::{Admin, AdminRepository, AuthService, InMemoryAdminRepository, TokenSettings};
use crate::market;
use crate::ratelimit::{InMemoryRateLimiter, RateLimitConfig, RateLimiter};
use crate::schema::{names, SchemaRegistry, SchemaResult};
use crate::store::{DataStore, MemoryStore};

/// Admission requirements of every endpoint
#[derive(Debug, Clone)]
pub struct Policies {
    pub list_accounts: EndpointPolicy,
    pub create_account: EndpointPolicy,
    pub get_account: EndpointPolicy,
    pub replace_account: EndpointPolicy,
    pub patch_account: EndpointPolicy,
    pub delete_account: EndpointPolicy,
    pub list_purchase_requests: EndpointPolicy,
    pub create_purchase_request: EndpointPolicy,
    pub get_purchase_request: EndpointPolicy,
    pub patch_purchase_request: EndpointPolicy,
    pub delete_purchase_request: EndpointPolicy,
    pub login: EndpointPolicy,
}

impl Policies {
    pub fn from_registry(registry: &SchemaRegistry) -> SchemaResult<Self> {
        Ok(Self {
            list_accounts: EndpointPolicy::new("accounts.list")
                .query(registry.get(names::ACCOUNT_QUERY)?),
            create_account: EndpointPolicy::new("accounts.create")
                .authenticated()
                .body(registry.get(names::ACCOUNT_CREATE)?),
            get_account: EndpointPolicy::new("accounts.get"),
            replace_account: EndpointPolicy::new("accounts.update")
                .authenticated()
                .body(registry.get(names::ACCOUNT_UPDATE)?),
            patch_account: EndpointPolicy::new("accounts.patch")
                .authenticated()
                .body(registry.get(names::ACCOUNT_UPDATE_PARTIAL)?),
            delete_account: EndpointPolicy::new("accounts.delete").authenticated(),
            list_purchase_requests: EndpointPolicy::new("purchase_requests.list")
                .authenticated()
                .query(registry.get(names::PURCHASE_REQUEST_QUERY)?),
            create_purchase_request: EndpointPolicy::new("purchase_requests.create")
                .rate_limited(RateLimitConfig::PUBLIC_FORM)
                .body(registry.get(names::PURCHASE_REQUEST_CREATE)?),
            get_purchase_request: EndpointPolicy::new("purchase_requests.get").authenticated(),
            patch_purchase_request: EndpointPolicy::new("purchase_requests.patch")
                .authenticated()
                .body(registry.get(names::PURCHASE_REQUEST_UPDATE_PARTIAL)?),
            delete_purchase_request: EndpointPolicy::new("purchase_requests.delete")
                .authenticated(),
            login: EndpointPolicy::new("auth.login")
                .rate_limited(RateLimitConfig::AUTH)
                .body(registry.get(names::LOGIN)?),
        })
    }
}

/// Shared state handed to every handler
pub struct AppState {
    pub gate: AdmissionGate,
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<AuthService>,
    pub policies: Policies,
}

impl AppState {
    /// Assemble state from already-built collaborators
    pub fn new(
        config: &HttpServerConfig,
        store: Arc<dyn DataStore>,
        auth: Arc<AuthService>,
        limiter: Arc<dyn RateLimiter>,
    ) -> ServerResult<Self> {
        let registry = SchemaRegistry::builtin()?;
        let gate = AdmissionGate::new(auth.clone(), limiter)
            .with_forwarded_policy(config.forwarded_headers.clone());

        Ok(Self {
            gate,
            store,
            auth,
            policies: Policies::from_registry(&registry)?,
        })
    }

    /// In-memory state: marketplace tables, admin store seeded with the
    /// bootstrap admin, process-local rate limiter.
    pub fn in_memory(config: &HttpServerConfig) -> ServerResult<Self> {
        let store = Arc::new(MemoryStore::with_tables(market::table_specs()));

        let admins = Arc::new(InMemoryAdminRepository::new());
        if let Some(bootstrap) = &config.bootstrap_admin {
            admins.create(&Admin::with_hash(
                bootstrap.email.clone(),
                bootstrap.password_hash.clone(),
                bootstrap.name.clone(),
            ))?;
            tracing::info!(email = %bootstrap.email, "bootstrap admin registered");
        }

        let auth = Arc::new(AuthService::new(
            admins,
            TokenSettings::for_secret(config.jwt_secret.clone()),
        ));

        Self::new(config, store, auth, Arc::new(InMemoryRateLimiter::new()))
    }

    pub fn limiter(&self) -> Arc<dyn RateLimiter> {
        self.gate.limiter().clone()
    }
}

/// Address of the connecting peer. Absent when the router is driven
/// without a listener, as in tests.
pub fn peer_ip(peer: &Option<ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    peer.as_ref().map(|ConnectInfo(addr)| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::InputSource;
    use crate::auth::crypto::hash_password;
    use crate::auth::LoginRequest;
    use crate::http_server::config::BootstrapAdmin;

    #[test]
    fn test_policies() {
        let registry = SchemaRegistry::builtin().unwrap();
        let policies = Policies::from_registry(&registry).unwrap();

        assert!(!policies.list_accounts.requires_auth());
        assert_eq!(policies.list_accounts.source(), InputSource::Query);
        assert!(policies.create_account.requires_auth());
        assert!(policies.create_purchase_request.rate_limit().is_some());
        assert!(!policies.create_purchase_request.requires_auth());
        assert_eq!(
            policies.create_purchase_request.rate_limit().map(|c| c.limit()),
            Some(3)
        );
        assert!(policies.get_purchase_request.requires_auth());
        assert!(policies.get_account.schema().is_none());
    }

    #[test]
    fn test_bootstrap_admin_can_log_in() {
        let config = HttpServerConfig {
            bootstrap_admin: Some(BootstrapAdmin {
                email: "owner@example.com".to_string(),
                password_hash: hash_password("Sup3rSecret").unwrap(),
                name: None,
            }),
            ..Default::default()
        };
        let state = AppState::in_memory(&config).unwrap();

        let response = state
            .auth
            .login(&LoginRequest {
                email: "owner@example.com".to_string(),
                password: "Sup3rSecret".to_string(),
            })
            .unwrap();
        assert_eq!(response.admin.email, "owner@example.com");
    }
}
