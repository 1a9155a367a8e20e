use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::cashout;
use crate::errors::ServiceError;
use crate::services::wallet::{CashoutRequest, WalletReconciliation};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ApproveCashoutRequest {
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RejectCashoutRequest {
    pub admin_id: Uuid,
    pub reason: String,
}

/// GET /api/v1/wallets/:vendor_id
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(vendor_id): Path<Uuid>,
) -> ApiResult<WalletReconciliation> {
    let wallet = state.services.wallets.reconcile(vendor_id).await?;
    Ok(Json(ApiResponse::success(wallet)))
}

pub async fn request_cashout(
    State(state): State<AppState>,
    Path(vendor_id): Path<Uuid>,
    Json(request): Json<CashoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<cashout::Model>>), ServiceError> {
    let cashout = state.services.wallets.request_cashout(vendor_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(cashout))))
}

pub async fn approve_cashout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveCashoutRequest>,
) -> ApiResult<cashout::Model> {
    let cashout = state
        .services
        .wallets
        .approve_cashout(id, request.admin_id)
        .await?;
    Ok(Json(ApiResponse::success(cashout)))
}

pub async fn reject_cashout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectCashoutRequest>,
) -> ApiResult<cashout::Model> {
    let cashout = state
        .services
        .wallets
        .reject_cashout(id, request.admin_id, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(cashout)))
}
