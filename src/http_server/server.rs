//! # HTTP Server
//!
//! Combines the endpoint routers under `/api`, adds CORS and request
//! tracing, and runs the rate limit sweeper alongside the listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::account_routes::account_routes;
use super::auth_routes::auth_routes;
use super::config::HttpServerConfig;
use super::errors::{ServerError, ServerResult};
use super::purchase_request_routes::purchase_request_routes;
use super::state::AppState;
use crate::ratelimit::spawn_sweeper;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// HTTP server for the marketplace API
pub struct HttpServer {
    config: HttpServerConfig,
    state: Arc<AppState>,
    router: Router,
}

impl HttpServer {
    /// Create a server backed by in-memory state
    pub fn with_config(config: HttpServerConfig) -> ServerResult<Self> {
        let state = Arc::new(AppState::in_memory(&config)?);
        Ok(Self::with_state(config, state))
    }

    /// Create a server around existing state
    pub fn with_state(config: HttpServerConfig, state: Arc<AppState>) -> Self {
        let router = Self::build_router(&config, state.clone());
        Self {
            config,
            state,
            router,
        }
    }

    /// Build the combined router with all endpoints
    fn build_router(config: &HttpServerConfig, state: Arc<AppState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let api = Router::new()
            .route("/health", get(health_handler))
            .merge(account_routes(state.clone()))
            .merge(purchase_request_routes(state.clone()))
            .merge(auth_routes(state));

        Router::new()
            .nest("/api", api)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process stops
    pub async fn start(self) -> ServerResult<()> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.config.socket_addr()))?;

        if self.config.uses_default_secret() {
            tracing::warn!("admin tokens are signed with the default secret; set MARKETGATE_JWT_SECRET");
        }

        let sweeper = spawn_sweeper(
            self.state.limiter(),
            Duration::from_millis(self.config.sweep_interval_ms.max(1)),
        );

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "marketgate listening");
        tracing::info!("health check: http://{}/api/health", addr);

        let served = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;

        sweeper.abort();
        served.map_err(ServerError::from)
    }
}

/// GET /api/health
async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
