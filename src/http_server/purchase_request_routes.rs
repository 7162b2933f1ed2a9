//! Purchase Request HTTP Routes
//!
//! Anyone may submit the public form, subject to the `PUBLIC_FORM` rate
//! limit. Reviewing submissions requires an admin.

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
use crate::admission::{AdmissionResult, Admitted, RawInput, RequestMeta};
use crate::market::{
    CreatePurchaseRequestInput, PurchaseRequest, PurchaseRequestQuery,
    UpdatePurchaseRequestInput, PURCHASE_REQUESTS_TABLE,
};
use crate::store::DataError;

type Peer = Option<ConnectInfo<SocketAddr>>;

pub fn purchase_request_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/purchase-requests",
            get(list_purchase_requests).post(create_purchase_request),
        )
        .route(
            "/purchase-requests/:id",
            get(get_purchase_request)
                .patch(patch_purchase_request)
                .delete(delete_purchase_request),
        )
        .with_state(state)
}

/// GET /purchase-requests
async fn list_purchase_requests(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> AdmissionResult<Json<ListResponse<PurchaseRequest>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let list = state.gate.process(
        &state.policies.list_purchase_requests,
        &meta,
        RawInput::Query(params),
        |admitted: Admitted<PurchaseRequestQuery>| {
            let query = admitted.input;
            let page = state
                .store
                .select(PURCHASE_REQUESTS_TABLE, &query.to_select_query())?;
            let total = page.total.unwrap_or(page.rows.len());
            Ok(ListResponse::new(
                records(page.rows)?,
                Pagination::new(query.page, query.limit, total),
            ))
        },
    )?;
    Ok(Json(list))
}

/// POST /purchase-requests
async fn create_purchase_request(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    headers: HeaderMap,
    body: Bytes,
) -> AdmissionResult<(StatusCode, Json<SingleResponse<PurchaseRequest>>)> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let (request, client) = state.gate.process(
        &state.policies.create_purchase_request,
        &meta,
        RawInput::Body(body),
        |admitted: Admitted<CreatePurchaseRequestInput>| {
            let row = state
                .store
                .insert(PURCHASE_REQUESTS_TABLE, admitted.input.into_row())?;
            Ok((record::<PurchaseRequest>(row)?, admitted.client))
        },
    )?;

    tracing::info!(
        request_id = %request.id,
        client = %client,
        desired_price = request.desired_price,
        "purchase request received"
    );
    Ok((StatusCode::CREATED, Json(SingleResponse::new(request))))
}

/// GET /purchase-requests/:id
async fn get_purchase_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
) -> AdmissionResult<Json<SingleResponse<PurchaseRequest>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let request = state.gate.process(
        &state.policies.get_purchase_request,
        &meta,
        RawInput::None,
        |_: Admitted<()>| record(state.store.find(PURCHASE_REQUESTS_TABLE, &id)?),
    )?;
    Ok(Json(SingleResponse::new(request)))
}

/// PATCH /purchase-requests/:id
async fn patch_purchase_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
    body: Bytes,
) -> AdmissionResult<Json<SingleResponse<PurchaseRequest>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let request: PurchaseRequest = state.gate.process(
        &state.policies.patch_purchase_request,
        &meta,
        RawInput::Body(body),
        |admitted: Admitted<UpdatePurchaseRequestInput>| {
            let patch = serde_json::to_value(&admitted.input)
                .map_err(|e| DataError::Internal(e.to_string()))?;
            record(state.store.update(PURCHASE_REQUESTS_TABLE, &id, patch)?)
        },
    )?;

    tracing::info!(request_id = %request.id, status = request.status.as_str(), "purchase request updated");
    Ok(Json(SingleResponse::new(request)))
}

/// DELETE /purchase-requests/:id
async fn delete_purchase_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    peer: Peer,
    headers: HeaderMap,
) -> AdmissionResult<Json<SingleResponse<Deleted>>> {
    let meta = RequestMeta::new(&headers, peer_ip(&peer));
    let removed = state.gate.process(
        &state.policies.delete_purchase_request,
        &meta,
        RawInput::None,
        |_: Admitted<()>| state.store.delete(PURCHASE_REQUESTS_TABLE, &id),
    )?;

    tracing::info!(request_id = %id, removed, "purchase request deleted");
    Ok(Json(SingleResponse::new(Deleted { id })))
}
