use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::entities::{batch_inventory, export_inventory};
use crate::errors::ServiceError;
use crate::services::inventory::{ExportStockInput, ReceiveBatchInput, StockSummary};
use crate::{ApiResponse, ApiResult, AppState};

/// POST /api/v1/inventory/batches
pub async fn receive_batch(
    State(state): State<AppState>,
    Json(input): Json<ReceiveBatchInput>,
) -> Result<(StatusCode, Json<ApiResponse<batch_inventory::Model>>), ServiceError> {
    let batch = state.services.inventory.receive_batch(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(batch))))
}

/// POST /api/v1/inventory/exports
pub async fn export_stock(
    State(state): State<AppState>,
    Json(input): Json<ExportStockInput>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<export_inventory::Model>>>), ServiceError> {
    let exports = state.services.inventory.export_stock(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(exports))))
}

pub async fn stock_summary(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StockSummary> {
    let summary = state.services.inventory.stock_summary(product_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
