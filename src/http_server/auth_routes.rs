//! Auth HTTP Routes
//!
//! Admin login. Attempts are rate limited per client with the `AUTH`
//! preset; a wrong email and a wrong password answer the same way.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};

use super::response::SingleResponse;
use super::state::{peer_ip, AppState};
use crate::admission::{AdmissionError, AdmissionResult, RawInput, RequestMeta};
use crate::auth::{LoginRequest, LoginResponse};

/// Auth routes with shared state
pub fn auth_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", post(login_handler))
        .with_state(state)
}

/// POST /auth/login
async fn login_handler(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> AdmissionResult<Json<SingleResponse<LoginResponse>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let admitted = state
        .gate
        .admit(&state.policies.login, &meta, RawInput::Body(body))?;
    let request: LoginRequest = serde_json::from_value(admitted.input)
        .map_err(|e| AdmissionError::Internal(format!("login input: {e}")))?;

    match state.auth.login(&request) {
        Ok(response) => {
            tracing::info!(admin_id = %response.admin.id, client = %admitted.client, "admin signed in");
            Ok(Json(SingleResponse::new(response)))
        }
        Err(err) => {
            tracing::info!(client = %admitted.client, reason = %err, "login failed");
            Err(err.into())
        }
    }
}
