use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::services::payments::{PaymentLinkResult, WebhookBody, WebhookOutcome};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub outcome: WebhookOutcome,
}

/// POST /api/v1/payments/:order_id/payos-link
pub async fn create_payos_link(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<PaymentLinkResult> {
    let link = state.services.payments.create_payos_link(order_id).await?;
    Ok(Json(ApiResponse::success(link)))
}

/// POST /api/v1/payments/payos/webhook
///
/// Always answers 200 once the signature checks out so PayOS stops retrying.
pub async fn payos_webhook(
    State(state): State<AppState>,
    Json(body): Json<WebhookBody>,
) -> ApiResult<WebhookAck> {
    let outcome = state.services.payments.handle_payos_webhook(body).await?;
    Ok(Json(ApiResponse::success(WebhookAck { outcome })))
}
