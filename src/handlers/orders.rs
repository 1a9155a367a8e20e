use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::entities::order;
use crate::errors::ServiceError;
use crate::services::orders::{
    ConfirmOrderRequest, OrderPreview, OrderWithDetails, PreviewOrderRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// POST /api/v1/orders/preview
pub async fn preview_order(
    State(state): State<AppState>,
    Json(request): Json<PreviewOrderRequest>,
) -> ApiResult<OrderPreview> {
    let preview = state.services.orders.preview_order(request).await?;
    Ok(Json(ApiResponse::success(preview)))
}

/// POST /api/v1/orders/confirm
pub async fn confirm_order(
    State(state): State<AppState>,
    Json(request): Json<ConfirmOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderWithDetails>>), ServiceError> {
    let created = state.services.orders.confirm_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderWithDetails> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn ship_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state.services.orders.mark_shipped(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn deliver_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state.services.orders.mark_delivered(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state.services.orders.cancel_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}
