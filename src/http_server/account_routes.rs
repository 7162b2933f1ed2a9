//! Account HTTP Routes
//!
//! Public listing and lookup; creating, editing and deleting listings
//! requires an admin.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use super::response::{record, records, Deleted, ListResponse, Pagination, SingleResponse};
use super::state::{peer_ip, AppState};
use crate::admission::{AdmissionResult, Admitted, EndpointPolicy, RawInput, RequestMeta};
use crate::market::{
    Account, AccountQuery, CreateAccountInput, UpdateAccountInput, ACCOUNTS_TABLE,
};
use crate::store::{DataError, DataResult};

type Peer = Option<ConnectInfo<SocketAddr>>;

/// Account routes with shared state
pub fn account_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account)
                .put(replace_account)
                .patch(patch_account)
                .delete(delete_account),
        )
        .with_state(state)
}

// ==================
// Handlers
// ==================

/// GET /accounts
async fn list_accounts(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> AdmissionResult<Json<ListResponse<Account>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let list = state.gate.process(
        &state.policies.list_accounts,
        &meta,
        RawInput::Query(params),
        |admitted: Admitted<AccountQuery>| {
            let query = admitted.input;
            let page = state.store.select(ACCOUNTS_TABLE, &query.to_select_query())?;
            let total = page.total.unwrap_or(page.rows.len());
            Ok(ListResponse::new(
                records(page.rows)?,
                Pagination::new(query.page, query.limit, total),
            ))
        },
    )?;
    Ok(Json(list))
}

/// POST /accounts
async fn create_account(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    headers: HeaderMap,
    body: Bytes,
) -> AdmissionResult<(StatusCode, Json<SingleResponse<Account>>)> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let account = state.gate.process(
        &state.policies.create_account,
        &meta,
        RawInput::Body(body),
        |admitted: Admitted<CreateAccountInput>| {
            let row = state.store.insert(ACCOUNTS_TABLE, admitted.input.into_row())?;
            record::<Account>(row)
        },
    )?;

    tracing::info!(account_id = %account.id, username = %account.username, "account listed");
    Ok((StatusCode::CREATED, Json(SingleResponse::new(account))))
}

/// GET /accounts/:id
async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
) -> AdmissionResult<Json<SingleResponse<Account>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let account = state.gate.process(
        &state.policies.get_account,
        &meta,
        RawInput::None,
        |_: Admitted<()>| record::<Account>(state.store.find(ACCOUNTS_TABLE, &id)?),
    )?;
    Ok(Json(SingleResponse::new(account)))
}

/// PUT /accounts/:id
async fn replace_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
    body: Bytes,
) -> AdmissionResult<Json<SingleResponse<Account>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    update(&state, &state.policies.replace_account, &meta, &id, body)
}

/// PATCH /accounts/:id
async fn patch_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
    body: Bytes,
) -> AdmissionResult<Json<SingleResponse<Account>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    update(&state, &state.policies.patch_account, &meta, &id, body)
}

fn update(
    state: &AppState,
    policy: &EndpointPolicy,
    meta: &RequestMeta<'_>,
    id: &str,
    body: Bytes,
) -> AdmissionResult<Json<SingleResponse<Account>>> {
    let account = state.gate.process(
        policy,
        meta,
        RawInput::Body(body),
        |admitted: Admitted<UpdateAccountInput>| -> DataResult<Account> {
            let patch = serde_json::to_value(&admitted.input)
                .map_err(|e| DataError::Internal(e.to_string()))?;
            record(state.store.update(ACCOUNTS_TABLE, id, patch)?)
        },
    )?;
    Ok(Json(SingleResponse::new(account)))
}

/// DELETE /accounts/:id
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
) -> AdmissionResult<Json<SingleResponse<Deleted>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let removed = state.gate.process(
        &state.policies.delete_account,
        &meta,
        RawInput::None,
        |_: Admitted<()>| state.store.delete(ACCOUNTS_TABLE, &id),
    )?;

    tracing::info!(account_id = %id, removed, "account deleted");
    Ok(Json(SingleResponse::new(Deleted { id })))
}
